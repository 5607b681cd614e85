//! Server CLI error types.

use std::fmt;

use pharmaduty::schedule::ScheduleError;
use pharmaduty::store::StoreError;

/// Errors that can occur while bringing the server up.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or inconsistent command-line configuration.
    Config(String),

    /// Failed to construct or seed the roster store.
    Store(StoreError),

    /// Failed to read or parse the seed file.
    Seed(String),

    /// Failed to bind or serve the listener.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Store(e) => write!(f, "Store error: {}", e),
            CliError::Seed(msg) => write!(f, "Seed error: {}", msg),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Store(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Config(_) | CliError::Seed(_) => None,
        }
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<ScheduleError> for CliError {
    fn from(e: ScheduleError) -> Self {
        CliError::Config(e.to_string())
    }
}
