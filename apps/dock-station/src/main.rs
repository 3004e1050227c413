//! # Dock Station Entry Point
//!
//! Console receiving station. Type or scan codes, one per line.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load configuration and catalog
//! 3. Attach the scan coordinator to the console input field
//! 4. Process stdin until `:quit` or end of input

use std::process::ExitCode;

fn main() -> ExitCode {
    // The actual setup is in lib.rs for better testability
    match dock_station_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dock-station: {e}");
            ExitCode::FAILURE
        }
    }
}
