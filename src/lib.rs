//! Waits for a shutdown trigger, then closes a set of resources concurrently
//! under one deadline and reports the ones that timed out or failed.

pub mod config;
pub mod lifecycle;
pub mod logger;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use config::DeathConfig;
pub use lifecycle::{
    Closable, Resource, ResourceRegistry, ShutdownCoordinator, ShutdownHandle, Sig, Trigger,
};
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use types::error::{DeathError, Result};
pub use types::{FailureKind, ResourceFailure, TeardownReport};
