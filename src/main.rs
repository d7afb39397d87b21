//! The main entry point for the reqlock CLI.

#![warn(missing_docs)]

use std::process::ExitCode;

use clap::Parser;
use reqlock::cli::{self, Args, logging};

//================================================================================================
// Functions
//================================================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = logging::init(args.log);

    if let Err(e) = args.enter_directory() {
        logging::fatal(&anyhow::Error::new(e).context("cannot enter the -C directory"));
        return ExitCode::FAILURE;
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Ctrl+C received, terminating...");
            ExitCode::FAILURE
        }
        res = cli::run(args) => match res {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                logging::fatal(&e);
                ExitCode::FAILURE
            },
        }
    }
}
