mod execute;
mod output;

pub use execute::{TypeEntry, TypesResult};

use clap::Args;

use crate::db::TypeCategory;

/// List the type registry built for the selected database
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  vtstore types                              # Every registered type
  vtstore types -c float                     # Only float types
  vtstore --db :memory: types -o json        # Built-in CozoDB specs as JSON")]
pub struct TypesCmd {
    /// Only list types of this category (e.g. integer, float, geo_point, matrix)
    #[arg(short, long)]
    pub category: Option<TypeCategory>,
}
