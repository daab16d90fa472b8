use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::Closable;
use crate::logger::{render_fields, Fields, Logger};

/// Closes instantly and successfully.
#[derive(Debug, Default)]
pub struct CountingCloser {
    pub closed: AtomicUsize,
}

impl CountingCloser {
    pub fn count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Closable for CountingCloser {
    async fn close(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Closes instantly with an error.
#[derive(Debug)]
pub struct FailingCloser {
    pub message: &'static str,
    pub closed: AtomicUsize,
}

impl FailingCloser {
    pub fn new(message: &'static str) -> Self {
        Self {
            message,
            closed: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Closable for FailingCloser {
    async fn close(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!(self.message))
    }
}

/// Never finishes and ignores cancellation.
#[derive(Debug, Default)]
pub struct HangingCloser {
    pub started: AtomicUsize,
}

impl HangingCloser {
    pub fn count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Closable for HangingCloser {
    async fn close(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Finishes after `delay`.
#[derive(Debug)]
pub struct SlowCloser {
    pub delay: Duration,
    pub closed: AtomicUsize,
}

impl SlowCloser {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            closed: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Closable for SlowCloser {
    async fn close(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Waits for cancellation and records that it saw it.
#[derive(Debug, Default)]
pub struct CooperativeCloser {
    pub cancelled: AtomicBool,
}

impl CooperativeCloser {
    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Closable for CooperativeCloser {
    async fn close(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        cancel.cancelled().await;
        self.cancelled.store(true, Ordering::SeqCst);
        Err(anyhow::anyhow!("aborted"))
    }
}

/// Panics inside close.
#[derive(Debug, Default)]
pub struct PanickingCloser;

#[async_trait]
impl Closable for PanickingCloser {
    async fn close(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        panic!("close exploded");
    }
}

/// Keeps every line as `LEVEL message fields`.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    fn push(&self, level: &str, message: &str, fields: Fields<'_>) {
        let line = format!("{} {} {}", level, message, render_fields(fields));
        self.lines.lock().unwrap().push(line.trim_end().to_string());
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str, fields: Fields<'_>) {
        self.push("INFO", message, fields);
    }

    fn debug(&self, message: &str, fields: Fields<'_>) {
        self.push("DEBUG", message, fields);
    }

    fn warn(&self, message: &str, fields: Fields<'_>) {
        self.push("WARN", message, fields);
    }

    fn error(&self, message: &str, fields: Fields<'_>) {
        self.push("ERROR", message, fields);
    }
}
