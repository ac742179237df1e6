//! Command dispatch: bridges CLI args -> session operations -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod discover;
pub mod groups;
pub mod hierarchy;
pub mod locations;
pub mod util;
pub mod zones;

use lumen_core::Session;

use crate::cli::{Command, GlobalOpts, HierarchyCommand};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Hierarchy(args) => match args.command {
            HierarchyCommand::Show => hierarchy::show(session, global),
            HierarchyCommand::Normalize { file } => hierarchy::normalize_file(&file, global),
        },
        Command::Zones(args) => zones::handle(session, args, global).await,
        Command::Groups(args) => groups::handle(session, args, global).await,
        Command::Locations(args) => locations::handle(session, args, global).await,
        Command::Devices(args) => devices::handle(session, args, global).await,
        Command::Discover(args) => discover::handle(session, args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "completions do not need a backend".into(),
        }),
    }
}
