//! Automatic reconnection policies
//!
//! By default a lost connection stays lost: pending requests are failed and
//! the client waits for the application to call `connect` again. Attaching a
//! [`ReconnectionStrategy`] to the builder makes the client retry on its own,
//! resolving the entrypoint from the last provider each time.
//!
//! Built-ins:
//!
//! - [`ExponentialBackoff`]: doubling delays up to a ceiling, optional jitter
//! - [`FixedDelay`]: the same delay every time
//! - [`NoReconnect`]: never retry
//!
//! ```rust
//! use jsonlink_client::{ExponentialBackoff, FixedDelay};
//! use std::time::Duration;
//!
//! // 100ms doubling to 30s, 10 attempts, jittered
//! let default = ExponentialBackoff::default();
//!
//! let steady = FixedDelay::new(Duration::from_secs(2)).with_max_attempts(5);
//! # let _ = (default, steady);
//! ```

use rand::Rng;
use std::time::Duration;

/// Decides whether and when to retry after a connection loss
///
/// `attempt` counts failed retries since the connection was lost, starting
/// at 0. `reset` runs after a retry succeeded.
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before retry number `attempt`, or `None` to give up
    fn next_delay(&mut self, attempt: u32) -> Option<Duration>;

    /// Forget accumulated state after a successful reconnect
    fn reset(&mut self) {}
}

/// Doubling delays: `initial * 2^attempt`, capped at `max_delay`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
    jitter: bool,
}

impl ExponentialBackoff {
    /// Unlimited attempts, no jitter
    pub fn new(initial: Duration, max_delay: Duration) -> Self {
        Self {
            initial,
            max_delay,
            max_attempts: None,
            jitter: false,
        }
    }

    /// Give up after `max_attempts` failed retries
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Add up to 25% random extra delay to each retry
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    fn base_delay(&self, attempt: u32) -> Duration {
        self.initial
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(30))
            .with_max_attempts(10)
            .with_jitter()
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        if self.max_attempts.is_some_and(|max| attempt >= max) {
            return None;
        }

        let delay = self.base_delay(attempt);
        if !self.jitter {
            return Some(delay);
        }

        let extra = rand::thread_rng().gen_range(0.0..=0.25);
        Some(delay + delay.mul_f64(extra))
    }
}

/// Constant delay between retries
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` failed retries
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt >= max => None,
            _ => Some(self.delay),
        }
    }
}

/// Never retry
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReconnect;

impl ReconnectionStrategy for NoReconnect {
    fn next_delay(&mut self, _attempt: u32) -> Option<Duration> {
        None
    }
}
