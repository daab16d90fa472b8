use std::time::Duration;

use crate::lifecycle::Sig;
use crate::{DeathError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Signals that start shutdown unless configured otherwise. Only Ctrl-C is
/// available everywhere.
pub fn default_signals() -> Vec<Sig> {
    if cfg!(unix) {
        vec![Sig::Interrupt, Sig::Terminate]
    } else {
        vec![Sig::Interrupt]
    }
}

#[derive(Debug, Clone)]
pub struct DeathConfig {
    /// Budget for closing every resource once shutdown starts.
    pub timeout: Duration,
    pub signals: Vec<Sig>,
    pub log_level: String,
}

impl Default for DeathConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            signals: default_signals(),
            log_level: "info".to_string(),
        }
    }
}

impl DeathConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(DeathError::InvalidTimeout);
        }
        if self.log_level.trim().is_empty() {
            return Err(DeathError::Config("log level must not be empty".to_string()));
        }
        Ok(())
    }
}
