//! a11yscan CLI - accessibility audits for zipped static sites and live
//! pages.

mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod progress;

use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    logging::init(cli.verbose, cli.quiet);
    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let show_progress = !cli.json && !cli.quiet && progress::CliProgress::should_show();

    let result = match &cli.command {
        cli::Commands::Scan(args) => commands::scan::execute(args, &*formatter, show_progress),
        cli::Commands::Live(args) => commands::live::execute(args, &*formatter, show_progress),
        cli::Commands::Report(args) => commands::report::execute(args, &*formatter),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            formatter.format_error(&err);
            ExitCode::from(error::exit_code(&err))
        }
    }
}
