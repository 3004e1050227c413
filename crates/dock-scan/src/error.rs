//! # Scan Error Types
//!
//! Error types for the scan engine.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Lifecycle     │  │     Resolution          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  AlreadyInstall.│  │  ResolutionFailed       │ │
//! │  │  ConfigLoad...  │  │  NoRuntime      │  │   └─ ResolverError      │ │
//! │  │  ConfigSave...  │  │  ChoiceNotPend. │  │      Transport/Timeout/ │ │
//! │  │                 │  │                 │  │      Rejected           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An unrecognized scan is not an error here; it never leaves dock-core as
//! anything but an absent result.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for scan engine operations.
pub type ScanResult<T> = Result<T, ScanError>;

// =============================================================================
// Resolver Error
// =============================================================================

/// Faults raised by an inventory resolver implementation.
///
/// The engine never propagates these to a surface: they are logged and turned
/// into an `Error` outcome for the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    /// The call could not reach the inventory service.
    #[error("Resolver transport failed: {0}")]
    Transport(String),

    /// The call did not answer in time.
    #[error("Resolver call timed out after {0} ms")]
    Timeout(u64),

    /// The service refused the request.
    #[error("Resolver rejected the request: {0}")]
    Rejected(String),
}

impl ResolverError {
    /// Returns true if repeating the call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolverError::Transport(_) | ResolverError::Timeout(_))
    }
}

// =============================================================================
// Scan Error
// =============================================================================

/// Scan engine error type.
#[derive(Debug, Error)]
pub enum ScanError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scan configuration.
    #[error("Invalid scan configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    /// The coordinator is already watching or attached.
    #[error("Scan coordinator is already installed")]
    AlreadyInstalled,

    /// No tokio runtime is available to run the engine.
    #[error("No tokio runtime available")]
    NoRuntime,

    /// No dismissed variant choice is waiting for this scan.
    #[error("No pending variant choice for scan {0}")]
    ChoiceNotPending(Uuid),

    // =========================================================================
    // Resolution Errors
    // =========================================================================
    /// A resolve or confirm call faulted.
    #[error("Resolution failed: {0}")]
    ResolutionFailed(#[from] ResolverError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ScanError {
    fn from(err: toml::ser::Error) -> Self {
        ScanError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ScanError {
    /// Returns true if the failed operation can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScanError::ResolutionFailed(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidConfig(_)
                | ScanError::ConfigLoadFailed(_)
                | ScanError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if this error comes from coordinator lifecycle misuse.
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            ScanError::AlreadyInstalled | ScanError::NoRuntime | ScanError::ChoiceNotPending(_)
        )
    }
}
