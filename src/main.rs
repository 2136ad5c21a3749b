use std::io;

use clap::Parser;
use tlk::format::ParseError;

fn main() {
    let args = tlk::cli::Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = tlk::run(args) {
        // Parse errors are already part of the report on stdout.
        if !err.is::<ParseError>() {
            eprintln!("{err:#}");
        }
        std::process::exit(1);
    }
}
