//! Command dispatch: bridges CLI args -> catalog operations -> output formatting.

pub mod categories;
pub mod config_cmd;
pub mod instruments;

use catalog_core::Catalog;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch an API-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    catalog: &Catalog,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Categories(args) => categories::handle(catalog, session, args, global).await,
        Command::Instruments(args) => instruments::handle(catalog, session, args, global).await,
        // Handled before a session exists.
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
