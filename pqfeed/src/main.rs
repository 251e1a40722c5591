use std::io;
use std::process;

use clap::Parser;
use pqfeed::cli::{Cli, run};

fn main() {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = run(&cli, &mut out) {
        tracing::debug!("pqfeed failed: {err:?}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}
