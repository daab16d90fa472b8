use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::component::{Closable, Resource};
use crate::logger::Logger;
use crate::types::{FailureKind, ResourceFailure, TeardownReport};
use crate::{DeathError, Result};

/// Bookkeeping for one resource during one teardown.
#[derive(Debug, Clone)]
struct Descriptor {
    index: usize,
    name: String,
    origin: String,
    error: Option<String>,
}

impl Descriptor {
    fn path(&self) -> String {
        format!("{}/{}", self.origin, self.name)
    }

    fn into_failure(self, kind: FailureKind) -> ResourceFailure {
        ResourceFailure {
            index: self.index,
            name: self.name,
            origin: self.origin,
            kind,
            reason: self.error,
        }
    }
}

/// Closes a batch of resources concurrently under one deadline.
pub struct MassTeardown {
    timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl MassTeardown {
    pub fn new(timeout: Duration, logger: Arc<dyn Logger>) -> Self {
        Self { timeout, logger }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Closes every resource once and reports the ones that timed out or
    /// failed.
    ///
    /// Closes still running at the deadline are abandoned: their tokens are
    /// cancelled but nothing waits for them.
    pub async fn run(&self, resources: Vec<Resource>) -> Result<TeardownReport> {
        if self.timeout.is_zero() {
            return Err(DeathError::InvalidTimeout);
        }

        let total = resources.len();
        if total == 0 {
            self.logger.debug("No resources to close", &[]);
            return Ok(TeardownReport::default());
        }

        let started = Instant::now();
        let timeout_ms = self.timeout.as_millis();
        self.logger.debug(
            "Closing resources",
            &[("count", &total), ("timeout_ms", &timeout_ms)],
        );

        let cancel = CancellationToken::new();
        let (done_tx, mut done_rx) = mpsc::channel::<Descriptor>(total);
        let mut pending: HashMap<usize, Descriptor> = HashMap::with_capacity(total);

        for (index, resource) in resources.into_iter().enumerate() {
            let descriptor = Descriptor {
                index,
                name: resource.name().to_string(),
                origin: resource.origin().to_string(),
                error: None,
            };
            tokio::spawn(close_one(
                resource.handle,
                descriptor.clone(),
                cancel.child_token(),
                done_tx.clone(),
            ));
            pending.insert(index, descriptor);
        }
        drop(done_tx);

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let mut remaining = total;
        let mut errored: Vec<Descriptor> = Vec::new();

        loop {
            tokio::select! {
                biased;

                done = done_rx.recv() => {
                    // Every sender gone with work outstanding means the close
                    // tasks were torn down with the runtime.
                    let Some(descriptor) = done else {
                        break;
                    };

                    pending.remove(&descriptor.index);
                    remaining = remaining.saturating_sub(1);

                    let path = descriptor.path();
                    match &descriptor.error {
                        Some(reason) => {
                            self.logger.error(
                                "Resource failed to close",
                                &[("resource", &path), ("error", reason)],
                            );
                        }
                        None => {
                            self.logger.debug("Resource closed", &[("resource", &path)]);
                        }
                    }
                    if descriptor.error.is_some() {
                        errored.push(descriptor);
                    }

                    self.logger.debug("Resources left", &[("remaining", &remaining)]);
                    if remaining == 0 && pending.is_empty() {
                        break;
                    }
                }

                _ = &mut deadline => {
                    self.logger.warn(
                        "Teardown deadline reached",
                        &[("pending", &pending.len()), ("timeout_ms", &timeout_ms)],
                    );
                    break;
                }
            }
        }

        if !pending.is_empty() {
            cancel.cancel();
        }

        let mut failures: Vec<ResourceFailure> = Vec::with_capacity(pending.len() + errored.len());
        for (_, descriptor) in pending {
            self.logger
                .error("Failed to close in time", &[("resource", &descriptor.path())]);
            failures.push(descriptor.into_failure(FailureKind::TimedOut));
        }
        failures.extend(
            errored
                .into_iter()
                .map(|d| d.into_failure(FailureKind::Errored)),
        );
        failures.sort_by_key(|f| f.index);

        let report = TeardownReport {
            total,
            closed: total - failures.len(),
            failures,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        self.logger.info(
            "Teardown finished",
            &[
                ("closed", &report.closed),
                ("failed", &report.failures.len()),
                ("elapsed_ms", &report.elapsed_ms),
            ],
        );

        if report.is_clean() {
            Ok(report)
        } else {
            Err(DeathError::Teardown(report))
        }
    }
}

/// Runs one close and reports it back, tagged with its descriptor.
///
/// The close runs in its own task so a panic surfaces as a join error
/// instead of silently dropping the completion.
async fn close_one(
    handle: Arc<dyn Closable>,
    mut descriptor: Descriptor,
    cancel: CancellationToken,
    done: mpsc::Sender<Descriptor>,
) {
    let outcome = tokio::spawn(async move { handle.close(cancel).await }).await;
    descriptor.error = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("{:#}", e)),
        Err(e) => Some(format!("close task failed: {}", e)),
    };
    // The receiver is gone once the deadline has passed.
    let _ = done.send(descriptor).await;
}
