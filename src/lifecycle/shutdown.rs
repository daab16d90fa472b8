use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::latch::{Trigger, TriggerLatch};
use super::signals::{Sig, SignalListener};
use super::teardown::MassTeardown;
use super::{Resource, ResourceRegistry};
use crate::config::{DeathConfig, DEFAULT_TIMEOUT};
use crate::logger::{Logger, NoopLogger};
use crate::types::TeardownReport;
use crate::{DeathError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    TearingDown,
    Complete,
}

/// Cloneable handle for triggering or observing shutdown from anywhere.
///
/// A handle may outlive its [`ShutdownCoordinator`], but dropping the
/// coordinator stops the signal listener. From then on only
/// [`ShutdownHandle::request_shutdown`] can release a pending
/// [`ShutdownHandle::wait`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    latch: Arc<TriggerLatch>,
}

impl ShutdownHandle {
    /// Requests shutdown. Never blocks; repeated calls are no-ops.
    pub fn request_shutdown(&self) {
        if self.latch.release(Trigger::Manual) {
            tracing::info!("Shutdown requested");
        }
    }

    pub fn is_released(&self) -> bool {
        self.latch.is_released()
    }

    /// Waits until shutdown has been triggered, by any source.
    pub async fn wait(&self) -> Trigger {
        self.latch.wait().await
    }
}

/// Waits for a shutdown trigger, then tears down the caller's resources.
///
/// Construction must happen inside a tokio runtime: signal interest is
/// registered immediately and the listener task is spawned right away, so a
/// signal that arrives before anyone waits is still observed.
pub struct ShutdownCoordinator {
    latch: Arc<TriggerLatch>,
    listener: JoinHandle<()>,
    timeout: Duration,
    logger: Arc<dyn Logger>,
    phase_tx: watch::Sender<ShutdownPhase>,
}

impl ShutdownCoordinator {
    /// Listens for any of `signals`. An empty set leaves only the manual
    /// trigger.
    pub fn new(signals: &[Sig]) -> Result<Self> {
        let mut listener = SignalListener::register(signals)?;
        tracing::debug!(signals = ?listener, "Registered shutdown signals");
        Ok(Self::with_trigger(async move {
            Trigger::Signal(listener.recv().await)
        }))
    }

    /// Uses `trigger` in place of OS signals. The latch is released with
    /// whatever it resolves to, unless a manual request wins first.
    pub fn with_trigger<F>(trigger: F) -> Self
    where
        F: Future<Output = Trigger> + Send + 'static,
    {
        let latch = Arc::new(TriggerLatch::new());
        let listener_latch = latch.clone();
        let listener = tokio::spawn(async move {
            tokio::select! {
                trigger = trigger => {
                    if listener_latch.release(trigger) {
                        tracing::info!(%trigger, "Shutdown triggered");
                    }
                }
                // Manual request won; stop listening.
                _ = listener_latch.wait() => {}
            }
        });

        let (phase_tx, _) = watch::channel(ShutdownPhase::Running);
        Self {
            latch,
            listener,
            timeout: DEFAULT_TIMEOUT,
            logger: Arc::new(NoopLogger),
            phase_tx,
        }
    }

    pub fn from_config(config: &DeathConfig) -> Result<Self> {
        config.validate()?;
        let mut coordinator = Self::new(&config.signals)?;
        coordinator.timeout = config.timeout;
        Ok(coordinator)
    }

    /// Sets the teardown budget. Zero is rejected.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<&mut Self> {
        if timeout.is_zero() {
            return Err(DeathError::InvalidTimeout);
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn set_logger(&mut self, logger: impl Logger + 'static) -> &mut Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            latch: self.latch.clone(),
        }
    }

    /// Requests shutdown. Never blocks; repeated calls are no-ops.
    pub fn request_shutdown(&self) {
        self.handle().request_shutdown();
    }

    pub fn is_released(&self) -> bool {
        self.latch.is_released()
    }

    /// What released the latch, once it has been released.
    pub fn trigger(&self) -> Option<Trigger> {
        self.latch.trigger()
    }

    pub fn phase_receiver(&self) -> watch::Receiver<ShutdownPhase> {
        self.phase_tx.subscribe()
    }

    /// Waits for the trigger without tearing anything down.
    pub async fn wait(&self) -> Trigger {
        self.latch.wait().await
    }

    /// Waits for the trigger, then closes `resources` within the timeout.
    pub async fn wait_for_shutdown(&self, resources: Vec<Resource>) -> Result<TeardownReport> {
        self.start().await;
        self.teardown(resources).await
    }

    /// Waits for the trigger, then closes everything in `registry`,
    /// including resources registered while waiting.
    pub async fn wait_for_shutdown_registered(
        &self,
        registry: &ResourceRegistry,
    ) -> Result<TeardownReport> {
        self.start().await;
        let resources = registry.take_all().await;
        self.teardown(resources).await
    }

    /// Waits for the trigger, then calls `f` once. No timeout applies.
    pub async fn wait_for_shutdown_with<F: FnOnce()>(&self, f: F) {
        self.start().await;
        f();
        self.phase_tx.send_replace(ShutdownPhase::Complete);
    }

    async fn start(&self) {
        let trigger = self.latch.wait().await;
        self.logger.info("Shutdown started", &[("trigger", &trigger)]);
        self.phase_tx.send_replace(ShutdownPhase::TearingDown);
    }

    async fn teardown(&self, resources: Vec<Resource>) -> Result<TeardownReport> {
        let result = MassTeardown::new(self.timeout, self.logger.clone())
            .run(resources)
            .await;
        self.phase_tx.send_replace(ShutdownPhase::Complete);
        result
    }
}

impl Drop for ShutdownCoordinator {
    fn drop(&mut self) {
        // Drops the signal registration along with the task.
        self.listener.abort();
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("timeout", &self.timeout)
            .field("trigger", &self.latch.trigger())
            .finish_non_exhaustive()
    }
}
