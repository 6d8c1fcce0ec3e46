#![deny(clippy::all, clippy::pedantic)]

use tessera::QueryClient;
use tessera::types::{ChildrenParams, ItemType};
use uuid::Uuid;

use crate::args::{ItemTypeArg, ItemsCmd};
use crate::client::{CliError, into_data};
use crate::print::print_json;

pub async fn handle(client: &QueryClient, cmd: ItemsCmd) -> Result<(), CliError> {
    match cmd {
        ItemsCmd::Get { id } => get(client, id).await,
        ItemsCmd::Children {
            id,
            types,
            keywords,
        } => children(client, id, &types, keywords).await,
        ItemsCmd::Many { ids } => many(client, &ids).await,
        ItemsCmd::Delete { ids } => print_json(&client.delete_items(&ids).await?),
        ItemsCmd::Move { ids, to } => print_json(&client.move_items(&ids, to).await?),
        ItemsCmd::Recycle { ids } => print_json(&client.recycle_items(&ids).await?),
    }
}

async fn get(client: &QueryClient, id: Uuid) -> Result<(), CliError> {
    let item = into_data(client.item(id).fetch().await)?;
    print_json(&item)
}

async fn children(
    client: &QueryClient,
    id: Uuid,
    types: &[ItemTypeArg],
    keywords: Option<String>,
) -> Result<(), CliError> {
    let params = ChildrenParams {
        keywords,
        ..ChildrenParams::of_types(types.iter().copied().map(ItemType::from))
    };
    let children = into_data(client.children(id, params).fetch().await)?;
    print_json(&children)
}

async fn many(client: &QueryClient, ids: &[Uuid]) -> Result<(), CliError> {
    let items = into_data(client.items_many(ids).fetch().await)?;
    print_json(&items)
}
