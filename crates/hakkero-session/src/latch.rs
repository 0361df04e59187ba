//! A set-once error slot that any number of tasks can wait on.

use std::sync::Arc;

use tokio::sync::watch;

use crate::ConnectionError;

/// Holds the first [`ConnectionError`] of a connection.
///
/// [`fire`](Self::fire) stores an error only if none is stored yet; later
/// calls are ignored. [`wait`](Self::wait) resolves as soon as an error is
/// stored, for every waiter, including ones that start waiting long after
/// the fact. Clones share the same slot.
#[derive(Debug, Clone)]
pub struct ErrorLatch {
    slot: Arc<watch::Sender<Option<ConnectionError>>>,
}

impl ErrorLatch {
    /// Creates an unset latch.
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
        }
    }

    /// Stores `error` if the latch is unset. Returns `true` if this call set it.
    pub fn fire(&self, error: ConnectionError) -> bool {
        self.slot.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(error);
            true
        })
    }

    /// The stored error, if any.
    pub fn get(&self) -> Option<ConnectionError> {
        self.slot.borrow().clone()
    }

    /// Returns `true` once an error is stored.
    pub fn is_set(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Waits until an error is stored and returns it.
    pub async fn wait(&self) -> ConnectionError {
        let mut rx = self.slot.subscribe();
        let error = match rx.wait_for(Option::is_some).await {
            Ok(current) => current.clone(),
            // Unreachable while `self` holds the sender.
            Err(_) => None,
        };
        error.unwrap_or(ConnectionError::Closed)
    }
}

impl Default for ErrorLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_fire_only_first_error_sticks() {
        let latch = ErrorLatch::new();
        assert!(latch.fire(ConnectionError::Read("reset".into())));
        assert!(!latch.fire(ConnectionError::Closed));
        assert_eq!(latch.get(), Some(ConnectionError::Read("reset".into())));
    }

    #[test]
    fn test_unset_latch_reports_nothing() {
        let latch = ErrorLatch::new();
        assert!(!latch.is_set());
        assert_eq!(latch.get(), None);
    }

    #[tokio::test]
    async fn test_wait_after_fire_returns_immediately() {
        let latch = ErrorLatch::new();
        latch.fire(ConnectionError::Closed);
        assert_eq!(latch.wait().await, ConnectionError::Closed);
        // And again: observing does not consume.
        assert_eq!(latch.wait().await, ConnectionError::Closed);
    }

    #[tokio::test]
    async fn test_wait_wakes_every_waiter() {
        let latch = ErrorLatch::new();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let latch = latch.clone();
                tokio::spawn(async move { latch.wait().await })
            })
            .collect();
        tokio::task::yield_now().await;

        latch.fire(ConnectionError::Write("broken pipe".into()));
        for waiter in waiters {
            assert_eq!(
                waiter.await.unwrap(),
                ConnectionError::Write("broken pipe".into())
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_blocks_while_unset() {
        let latch = ErrorLatch::new();
        let result = tokio::time::timeout(Duration::from_secs(1), latch.wait()).await;
        assert!(result.is_err());
    }
}
