use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use super::signals::Sig;

/// What released the latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Signal(Sig),
    Manual,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signal(sig) => write!(f, "signal {}", sig),
            Self::Manual => write!(f, "manual request"),
        }
    }
}

/// One-shot gate: armed until the first trigger, released forever after.
///
/// The atomic flag decides the single winner; the watch channel carries the
/// winning cause to every waiter, including ones that subscribe late.
#[derive(Debug)]
pub struct TriggerLatch {
    released: AtomicBool,
    cause: watch::Sender<Option<Trigger>>,
}

impl TriggerLatch {
    pub fn new() -> Self {
        let (cause, _) = watch::channel(None);
        Self {
            released: AtomicBool::new(false),
            cause,
        }
    }

    /// Releases the latch. Returns `true` only for the call that won.
    pub fn release(&self, trigger: Trigger) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.cause.send_replace(Some(trigger));
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// The winning trigger, once released.
    pub fn trigger(&self) -> Option<Trigger> {
        *self.cause.borrow()
    }

    /// Waits until released and returns the winning trigger.
    pub async fn wait(&self) -> Trigger {
        let mut rx = self.cause.subscribe();
        let trigger = match rx.wait_for(Option::is_some).await {
            Ok(cause) => (*cause).unwrap_or(Trigger::Manual),
            // The sender lives in `self`, so it cannot close while we borrow it.
            Err(_) => Trigger::Manual,
        };
        trigger
    }
}

impl Default for TriggerLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_first_release_wins() {
        let latch = TriggerLatch::new();
        assert!(!latch.is_released());
        assert_eq!(latch.trigger(), None);

        assert!(latch.release(Trigger::Signal(Sig::Terminate)));
        assert!(!latch.release(Trigger::Manual));
        assert!(!latch.release(Trigger::Signal(Sig::Interrupt)));

        assert!(latch.is_released());
        assert_eq!(latch.trigger(), Some(Trigger::Signal(Sig::Terminate)));
    }

    #[tokio::test]
    async fn test_wait_blocks_until_release() {
        let latch = Arc::new(TriggerLatch::new());

        let pending = tokio::time::timeout(Duration::from_millis(20), latch.wait()).await;
        assert!(pending.is_err());

        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        latch.release(Trigger::Manual);

        assert_eq!(waiter.await.unwrap(), Trigger::Manual);
    }

    #[tokio::test]
    async fn test_many_waiters_all_return() {
        let latch = Arc::new(TriggerLatch::new());
        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let latch = latch.clone();
                tokio::spawn(async move { latch.wait().await })
            })
            .collect();

        latch.release(Trigger::Signal(Sig::Hangup));

        for waiter in waiters {
            let trigger = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(trigger, Trigger::Signal(Sig::Hangup));
        }
    }

    #[tokio::test]
    async fn test_wait_after_release_is_immediate() {
        let latch = TriggerLatch::new();
        latch.release(Trigger::Manual);

        for _ in 0..2 {
            let trigger = tokio::time::timeout(Duration::from_millis(50), latch.wait())
                .await
                .unwrap();
            assert_eq!(trigger, Trigger::Manual);
        }
    }

    #[tokio::test]
    async fn test_concurrent_releases_have_one_winner() {
        let latch = Arc::new(TriggerLatch::new());
        let racers: Vec<_> = (0..16)
            .map(|_| {
                let latch = latch.clone();
                tokio::spawn(async move { latch.release(Trigger::Manual) })
            })
            .collect();

        let mut winners = 0;
        for racer in racers {
            if racer.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
