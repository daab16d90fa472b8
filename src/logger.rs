//! Logging capability used by the shutdown core.
//!
//! The core only ever reports through [`Logger`]; nothing it logs feeds back
//! into control flow. [`NoopLogger`] is the default, [`TracingLogger`] forwards
//! to `tracing`.

use std::fmt::{Display, Write};

/// Structured key/value pairs attached to a log line.
pub type Fields<'a> = &'a [(&'a str, &'a dyn Display)];

pub trait Logger: Send + Sync {
    fn info(&self, message: &str, fields: Fields<'_>);
    fn debug(&self, message: &str, fields: Fields<'_>);
    fn warn(&self, message: &str, fields: Fields<'_>);
    fn error(&self, message: &str, fields: Fields<'_>);
}

impl<L: Logger + ?Sized> Logger for std::sync::Arc<L> {
    fn info(&self, message: &str, fields: Fields<'_>) {
        (**self).info(message, fields)
    }

    fn debug(&self, message: &str, fields: Fields<'_>) {
        (**self).debug(message, fields)
    }

    fn warn(&self, message: &str, fields: Fields<'_>) {
        (**self).warn(message, fields)
    }

    fn error(&self, message: &str, fields: Fields<'_>) {
        (**self).error(message, fields)
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn info(&self, _message: &str, _fields: Fields<'_>) {}
    fn debug(&self, _message: &str, _fields: Fields<'_>) {}
    fn warn(&self, _message: &str, _fields: Fields<'_>) {}
    fn error(&self, _message: &str, _fields: Fields<'_>) {}
}

/// Forwards to the `tracing` macros under the `deathwatch` target.
///
/// Field names are only known at runtime, so they are rendered into a single
/// `fields` value as `key=value` pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str, fields: Fields<'_>) {
        if fields.is_empty() {
            tracing::info!(target: "deathwatch", "{}", message);
        } else {
            tracing::info!(target: "deathwatch", fields = %render_fields(fields), "{}", message);
        }
    }

    fn debug(&self, message: &str, fields: Fields<'_>) {
        if fields.is_empty() {
            tracing::debug!(target: "deathwatch", "{}", message);
        } else {
            tracing::debug!(target: "deathwatch", fields = %render_fields(fields), "{}", message);
        }
    }

    fn warn(&self, message: &str, fields: Fields<'_>) {
        if fields.is_empty() {
            tracing::warn!(target: "deathwatch", "{}", message);
        } else {
            tracing::warn!(target: "deathwatch", fields = %render_fields(fields), "{}", message);
        }
    }

    fn error(&self, message: &str, fields: Fields<'_>) {
        if fields.is_empty() {
            tracing::error!(target: "deathwatch", "{}", message);
        } else {
            tracing::error!(target: "deathwatch", fields = %render_fields(fields), "{}", message);
        }
    }
}

pub(crate) fn render_fields(fields: Fields<'_>) -> String {
    let mut out = String::new();
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}={}", key, value);
    }
    out
}
