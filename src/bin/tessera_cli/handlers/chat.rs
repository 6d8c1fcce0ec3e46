#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::PathBuf;

use tessera::QueryClient;
use tessera::mutation::PostChatMessage;
use tessera::types::NewChatMessage;
use uuid::Uuid;

use crate::args::ChatCmd;
use crate::client::{CliError, into_data};
use crate::print::print_json;

pub async fn handle(client: &QueryClient, cmd: ChatCmd) -> Result<(), CliError> {
    match cmd {
        ChatCmd::List { item_id } => {
            let messages = into_data(client.item_chat(item_id).fetch().await)?;
            print_json(&messages)
        }
        ChatCmd::Post {
            item_id,
            body,
            body_file,
        } => post(client, item_id, read_body(body, body_file)?).await,
    }
}

async fn post(client: &QueryClient, item_id: Uuid, body: String) -> Result<(), CliError> {
    let message = NewChatMessage {
        body,
        mentions: Vec::new(),
    };
    let created = client
        .mutate(PostChatMessage { item_id, message })
        .await?;
    print_json(&created)
}

/// Message body from a file or inline; the file wins.
pub fn read_body(inline: Option<String>, file: Option<PathBuf>) -> Result<String, CliError> {
    let body = match file {
        Some(path) => fs::read_to_string(&path).map_err(|source| CliError::InputFile {
            path: path.display().to_string(),
            source,
        })?,
        None => inline.ok_or_else(|| CliError::InvalidInput("--body or --body-file required".into()))?,
    };
    if body.trim().is_empty() {
        return Err(CliError::InvalidInput("message body is empty".into()));
    }
    Ok(body)
}
