//! Pilum CLI binary.

use std::process;

use clap::Parser;

use pilum::cli::args::*;
use pilum::cli::commands::*;

fn main() {
    let args = PilumArgs::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
