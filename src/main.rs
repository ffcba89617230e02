//! scriptrun - sequential runner for external data-processing scripts
//!
//! Runs a fixed, ordered list of scripts one at a time, stops at the first
//! failure and appends a timestamped record of every step to a run log.

mod cli;
mod core;
mod host;
mod logging;
mod runner;
mod settings;

use clap::Parser;
use cli::{exit_codes, Cli, Commands};

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.json_output) {
        eprintln!("Failed to initialize logging: {}", e);
        return exit_codes::UNEXPECTED_FAILURE;
    }

    match cli.command {
        Some(Commands::List(args)) => match cli::list::run(&cli.global, args) {
            Ok(()) => exit_codes::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                exit_codes::SETUP_FAILED
            }
        },
        Some(Commands::Run) | None => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Failed to create runtime: {}", e);
                    return exit_codes::UNEXPECTED_FAILURE;
                }
            };

            rt.block_on(async {
                match cli::run::run(&cli.global).await {
                    Ok(code) => code,
                    Err(e) => {
                        eprintln!("Error: {:#}", e);
                        exit_codes::SETUP_FAILED
                    }
                }
            })
        }
    }
}
