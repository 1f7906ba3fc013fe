//! bsarc CLI - Command-line utility for extracting Bethesda BSA and BA2
//! archives.

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let show_progress = !cli.quiet && !cli.json;

    let result = match &cli.command {
        cli::Commands::Extract(args) => commands::extract::execute(args, &*formatter, show_progress),
        cli::Commands::List(args) => commands::list::execute(args, &*formatter),
        cli::Commands::Verify(args) => commands::verify::execute(args, &*formatter, show_progress),
        cli::Commands::Scan(args) => commands::scan::execute(args, &*formatter, show_progress),
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            formatter.format_error(&err);
            ExitCode::FAILURE
        }
    }
}
