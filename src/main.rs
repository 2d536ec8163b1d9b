use anyhow::Result;
use clap::Parser;
use repo_audit::cli;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        // Plain stderr: config and input errors happen before logging is up.
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
    Ok(())
}
