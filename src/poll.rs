//! Waiting for Prisma Cloud to catch up with its own writes.
//!
//! The API acknowledges a create before the new object shows up in lookups by
//! name, and a lookup by name can succeed before a get by id does. A
//! [`Poller`] turns that into a bounded wait: it reruns a read-only probe until
//! the probe succeeds, the wait budget is spent, or the poller is cancelled.
//!
//! Every probe error is treated as "not visible yet". A permanent failure is
//! therefore only reported once the budget runs out, wrapped in
//! [`ProviderError::DeadlineExceeded`] with the last error attached.

use std::future::Future;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::config::PollConfig;
use crate::error::ProviderError;

/// Bounded retry loop for idempotent remote reads.
#[derive(Debug, Clone)]
pub struct Poller {
    config: PollConfig,
    cancel: CancellationToken,
}

impl Poller {
    /// Create a poller that can only stop on success or deadline.
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop waiting as soon as `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The retry parameters in use.
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Run `probe` until it returns `Ok`, and hand back its value.
    ///
    /// `what` names the thing being waited for in logs and errors. The probe
    /// must not have side effects beyond the read it performs.
    pub async fn until_visible<T, F, Fut>(&self, what: &str, mut probe: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let started = Instant::now();
        let deadline = started + self.config.max_wait;
        let mut delay = self.config.interval;
        let mut attempts = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(what, attempts));
            }

            attempts += 1;
            let err = match probe().await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(what, attempts, elapsed = ?started.elapsed(), "Remote change became visible");
                    }
                    return Ok(value);
                },
                Err(err) => err,
            };

            let now = Instant::now();
            let out_of_attempts = self.config.max_attempts.is_some_and(|max| attempts >= max);
            if now >= deadline || out_of_attempts {
                warn!(what, attempts, error = %err, "Gave up waiting for remote change");
                return Err(ProviderError::DeadlineExceeded {
                    what: what.to_string(),
                    attempts,
                    source: err,
                });
            }

            let pause = delay.min(deadline - now);
            debug!(what, attempts, error = %err, retry_in = ?pause, "Remote change not visible yet");
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(self.cancelled(what, attempts)),
                _ = tokio::time::sleep(pause) => {},
            }
            delay = self.config.next_delay(delay);
        }
    }

    fn cancelled(&self, what: &str, attempts: u32) -> ProviderError {
        warn!(what, attempts, "Stopped waiting for remote change: cancelled");
        ProviderError::Cancelled(format!("while waiting for {}", what))
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(PollConfig::default())
    }
}
