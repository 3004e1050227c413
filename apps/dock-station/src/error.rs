//! # Station Error Type
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Station                            │
//! │                                                                         │
//! │  startup ── ScanError (config, runtime) ──────────┐                    │
//! │          ── catalog read / parse ─────────────────┼──► StationError    │
//! │  loop    ── stdin I/O, stale choice ──────────────┤      │             │
//! │          ── bad command ──────────────────────────┘      ▼             │
//! │                                              startup: exit code 1      │
//! │                                              command: printed, loop    │
//! │                                                         continues      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scan outcomes are never errors here: the engine turns them into
//! notifications.

use std::path::PathBuf;

use thiserror::Error;

use dock_scan::ScanError;

/// Errors raised by the station.
#[derive(Debug, Error)]
pub enum StationError {
    /// Engine setup or lifecycle error
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Catalog file could not be read
    #[error("Failed to read catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog file is not valid JSON for a catalog
    #[error("Invalid catalog: {0}")]
    CatalogParse(#[from] serde_json::Error),

    /// Terminal I/O failed
    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `:` command that could not be understood
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A command that needs something the station does not have right now
    #[error("{0}")]
    Unavailable(String),
}

impl StationError {
    /// Returns true if the station cannot start or continue.
    ///
    /// A scan error from a single command, such as reopening a choice that
    /// is no longer pending, is reported and the loop goes on.
    pub fn is_fatal(&self) -> bool {
        match self {
            StationError::Scan(err) => {
                err.is_config_error() || matches!(err, ScanError::NoRuntime)
            }
            StationError::CatalogRead { .. }
            | StationError::CatalogParse(_)
            | StationError::Io(_) => true,
            StationError::UnknownCommand(_) | StationError::Unavailable(_) => false,
        }
    }
}

/// Result type alias for station operations.
pub type StationResult<T> = Result<T, StationError>;
