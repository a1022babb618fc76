//! Entry point for the spectrogram streaming server.

use std::process::ExitCode;

fn main() -> ExitCode {
    match specstreamd::run_server(std::env::args_os()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("specstreamd: {error}");
            ExitCode::FAILURE
        }
    }
}
