pub mod error;
pub mod report;

pub use error::{DeathError, Result};
pub use report::{FailureKind, ResourceFailure, TeardownReport};
