use std::process::ExitCode;

use clap::Parser;
use log::debug;
use logbook_core::LogbookError;

mod cli;
mod commands;
mod logging;
mod settings;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _logger = match logging::init_logging(cli.verbose) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("logbook: {e:#}");
            None
        }
    };

    match commands::run(cli, settings::load_settings()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!("{err:?}");
            if let Some(e) = err.downcast_ref::<LogbookError>() {
                eprintln!("logbook: {}", e.user_message());
            } else {
                eprintln!("logbook: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
