#![deny(clippy::all, clippy::pedantic)]

use tessera::QueryClient;
use tessera::types::TagSearch;

use crate::args::TagsCmd;
use crate::client::{CliError, into_data};
use crate::print::print_json;

pub async fn handle(client: &QueryClient, cmd: TagsCmd) -> Result<(), CliError> {
    match cmd {
        TagsCmd::Search { text, category } => {
            let search = TagSearch {
                search: text,
                category: category.map(Into::into),
            };
            if search.normalized_search().is_none() {
                return Err(CliError::InvalidInput("search text is blank".into()));
            }
            let counts = into_data(client.search_tags(search).fetch().await)?;
            print_json(&counts)
        }
    }
}
