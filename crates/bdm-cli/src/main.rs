use bdm_core::logging;
use clap::Parser;

mod cli;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Initialize logging as early as possible.
    if cli.log_file {
        if let Err(err) = logging::init_logging_file() {
            logging::init_logging_stderr();
            tracing::warn!("could not open log file, logging to stderr: {:#}", err);
        }
    } else {
        logging::init_logging_stderr();
    }

    if let Err(err) = cli.run() {
        eprintln!("bdm error: {:#}", err);
        std::process::exit(1);
    }
}
