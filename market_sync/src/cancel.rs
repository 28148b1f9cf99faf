//! Cooperative cancellation shared between a polling loop and its fetch worker.
//!
//! A `CancelToken` is a cloneable flag. Cancelling it does not stop anything by
//! itself: adapters poll [`CancelToken::is_cancelled`] between requests and use
//! [`CancelToken::sleep`] for cooldowns, which returns early once cancelled.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use market_common::{MarketError, Result};

/// Cloneable, one-shot cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation and wake every sleeper.
    pub fn cancel(&self) {
        let (flag, wake) = &*self.inner;
        let mut cancelled = flag.lock().unwrap_or_else(|p| p.into_inner());
        *cancelled = true;
        wake.notify_all();
    }

    /// Whether `cancel` was called on this token or any clone of it.
    pub fn is_cancelled(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MarketError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `Err(Cancelled)` if the token fired before or during the wait.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let (flag, wake) = &*self.inner;
        let guard = flag.lock()?;
        let (cancelled, _) = wake.wait_timeout_while(guard, duration, |cancelled| !*cancelled)?;
        if *cancelled {
            Err(MarketError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(MarketError::Cancelled)));
    }

    #[test]
    fn sleep_completes_when_not_cancelled() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(5)).is_ok());
    }

    #[test]
    fn cancel_interrupts_sleep() {
        let token = CancelToken::new();
        let clone = token.clone();
        let started = Instant::now();
        let handle = thread::spawn(move || clone.sleep(Duration::from_secs(30)));
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(MarketError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
