//! One-shot termination signal shared between a task and its controllers.

use std::future::Future;

use tokio::sync::watch;

/// Latching shutdown / cancellation signal.
///
/// Once triggered it stays triggered. Waiters created before or after the trigger
/// resolve immediately after it.
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender,
        }
    }

    /// trigger the signal
    pub fn shutdown(&self) {
        self.sender.send_replace(true);
    }

    /// whether the signal has been triggered
    pub fn is_terminated(&self) -> bool {
        *self.sender.borrow()
    }

    /// future resolving once the signal is triggered
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut receiver = self.sender.subscribe();
        async move {
            let _ = receiver.wait_for(|terminated| *terminated).await;
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::Shutdown;

    #[tokio::test]
    async fn test_wait_resolves_after_trigger() {
        let shutdown = Shutdown::new();
        let waiter = shutdown.wait();
        assert!(!shutdown.is_terminated());

        shutdown.shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait()).await.unwrap();
        assert!(shutdown.is_terminated());
    }
}
