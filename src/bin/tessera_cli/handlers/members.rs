#![deny(clippy::all, clippy::pedantic)]

use tessera::QueryClient;

use crate::args::MembersCmd;
use crate::client::{CliError, into_data};
use crate::print::print_json;

pub async fn handle(client: &QueryClient, cmd: MembersCmd) -> Result<(), CliError> {
    match cmd {
        MembersCmd::Current => {
            let member = into_data(client.current_member().fetch().await)?;
            print_json(&member)
        }
    }
}
