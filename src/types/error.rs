use thiserror::Error;

use super::report::TeardownReport;

#[derive(Error, Debug)]
pub enum DeathError {
    #[error("{0}")]
    Teardown(TeardownReport),

    #[error("Invalid timeout: teardown timeout must be greater than zero")]
    InvalidTimeout,

    #[error("Signal registration failed: {0}")]
    Signal(String),

    #[error("Signal not supported on this platform: {0}")]
    UnsupportedSignal(String),

    #[error("Unknown signal: {0}")]
    InvalidSignal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DeathError>;

impl DeathError {
    /// The teardown report, if this error came out of a teardown.
    pub fn report(&self) -> Option<&TeardownReport> {
        match self {
            Self::Teardown(report) => Some(report),
            _ => None,
        }
    }
}
