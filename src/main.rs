//! jobbox - file-backed store for shell command jobs

use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    if let Err(e) = jobbox::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
