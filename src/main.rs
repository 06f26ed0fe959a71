use clap::Parser;

use vtstore::cli::{self, Args};
use vtstore::db::BackendSelector;
use vtstore::logging;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_tracing(args.verbose);

    let config = cli::resolve_database(args.db.as_deref())?;
    let mut session = BackendSelector::for_config(&config).open_session(&config)?;
    let output = args.command.run(&mut session, args.format)?;
    println!("{}", output);
    Ok(())
}
