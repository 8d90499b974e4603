//! Provider configuration.
//!
//! The orchestrator sends the provider block as JSON. Keys this crate does not
//! know about (credentials, API URL) belong to the client that owns the
//! session and are ignored here.
//!
//! ```
//! use prismacloud_provider::config::ProviderConfig;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let config = ProviderConfig::from_value(json!({
//!     "url": "api.prismacloud.io",
//!     "retry": {"interval_ms": 250, "max_wait_ms": 5000},
//!     "log_level": "debug"
//! }))
//! .unwrap();
//!
//! assert_eq!(config.retry.interval, Duration::from_millis(250));
//! assert_eq!(config.log_level.as_deref(), Some("debug"));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema};

/// Default delay between two visibility probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default upper bound for a single backoff delay.
pub const DEFAULT_POLL_MAX_INTERVAL: Duration = Duration::from_secs(10);

/// Default total time spent waiting for a change to become visible.
pub const DEFAULT_POLL_MAX_WAIT: Duration = Duration::from_secs(30);

/// Retry parameters for the eventual-consistency poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay before the first retry.
    #[serde(rename = "interval_ms", with = "millis")]
    pub interval: Duration,
    /// Cap on any single delay once backoff kicks in.
    #[serde(rename = "max_interval_ms", with = "millis")]
    pub max_interval: Duration,
    /// Factor applied to the delay after every failed probe. `1.0` keeps the
    /// interval fixed.
    pub backoff_multiplier: f64,
    /// Total wall-clock budget for one wait.
    #[serde(rename = "max_wait_ms", with = "millis")]
    pub max_wait: Duration,
    /// Optional cap on the number of probes.
    pub max_attempts: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_interval: DEFAULT_POLL_MAX_INTERVAL,
            backoff_multiplier: 1.0,
            max_wait: DEFAULT_POLL_MAX_WAIT,
            max_attempts: None,
        }
    }
}

impl PollConfig {
    /// Set the initial retry interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the total wait budget.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Set the backoff multiplier and the cap on a single delay.
    pub fn with_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.backoff_multiplier = multiplier;
        self.max_interval = max_interval;
        self
    }

    /// Cap the number of probes.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// The delay to use after `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        if self.backoff_multiplier <= 1.0 {
            return current;
        }
        let cap = self.max_interval.max(self.interval);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .unwrap_or(cap)
            .min(cap)
    }

    fn check(&self) -> Result<(), ProviderError> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ProviderError::Configuration(format!(
                "retry.backoff_multiplier must be at least 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.max_attempts == Some(0) {
            return Err(ProviderError::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings taken from the provider block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// Visibility polling parameters.
    pub retry: PollConfig,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: Option<String>,
}

impl ProviderConfig {
    /// Parse and sanity-check the provider block.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        let value = if value.is_null() {
            Value::Object(Default::default())
        } else {
            value
        };
        let config: Self = serde_json::from_value(value)
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        config.retry.check()?;
        Ok(config)
    }

    /// The schema of the provider block, as far as this crate reads it.
    pub fn schema() -> Schema {
        let retry = Block::new()
            .with_attribute(
                "interval_ms",
                Attribute::optional_int64().with_description("Delay before the first retry"),
            )
            .with_attribute(
                "max_interval_ms",
                Attribute::optional_int64().with_description("Upper bound for one backoff delay"),
            )
            .with_attribute(
                "backoff_multiplier",
                Attribute::optional_float64()
                    .with_description("Factor applied to the delay after every failed probe"),
            )
            .with_attribute(
                "max_wait_ms",
                Attribute::optional_int64().with_description("Total time to wait for visibility"),
            )
            .with_attribute(
                "max_attempts",
                Attribute::optional_int64().with_description("Maximum number of probes"),
            );

        Schema::v0()
            .with_description("Prisma Cloud provider")
            .with_attribute(
                "log_level",
                Attribute::optional_string().with_description("Default log filter"),
            )
            .with_block("retry", NestedBlock::single(retry))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{ser, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis())
            .map_err(|_| ser::Error::custom(format!("{value:?} does not fit in u64 milliseconds")))?;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
