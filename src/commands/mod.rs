//! Command definitions and implementations.
//!
//! Each command is defined in its own module with:
//! - The command struct with clap attributes for CLI parsing
//! - An `execute` module producing a serializable result from a session
//! - An `output` module implementing [`Outputable`] for that result

pub mod query;
pub mod types;

pub use query::QueryCmd;
pub use types::TypesCmd;

use clap::Subcommand;
use std::error::Error;

use crate::db::Session;
use crate::output::{OutputFormat, Outputable};

/// Trait for executing commands with command-specific result types.
pub trait Execute {
    type Output: Outputable;

    fn execute(self, session: &mut Session) -> Result<Self::Output, Box<dyn Error>>;
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a query script and print every cell through the result cursor
    Query(QueryCmd),

    /// List the type registry built for the selected database
    Types(TypesCmd),
}

impl Command {
    /// Execute the command and return formatted output
    pub fn run(self, session: &mut Session, format: OutputFormat) -> Result<String, Box<dyn Error>> {
        match self {
            Command::Query(cmd) => {
                let result = cmd.execute(session)?;
                Ok(result.format(format))
            }
            Command::Types(cmd) => {
                let result = cmd.execute(session)?;
                Ok(result.format(format))
            }
        }
    }
}
