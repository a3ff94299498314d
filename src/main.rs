#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // no console window in release builds

mod cli;

use std::{error::Error as _, process::ExitCode};

use clap::Parser;
use cli::Args;
use odisauth::{app, logging, platform};

fn main() -> ExitCode {
    let args = Args::parse();

    platform::suppress_error_dialogs();

    if let Err(e) = logging::init(&args.log_file, logging::level_for_verbosity(args.verbose)) {
        eprintln!("could not open {}: {e}", args.log_file.display());
        return ExitCode::FAILURE;
    }

    tracing::debug!(config = %args.config.display(), "starting ODIS login");

    match app::run(&args.options()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");

            let mut source = e.source();
            while let Some(cause) = source {
                tracing::debug!("caused by: {cause}");
                source = cause.source();
            }

            ExitCode::FAILURE
        }
    }
}
