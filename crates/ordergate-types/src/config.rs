//! Configuration types for the admission pipeline.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{OrdergateError, Result, constants};

/// Whole seconds as a signed duration, `None` if unrepresentable.
#[must_use]
pub fn duration_from_secs(secs: u64) -> Option<Duration> {
    i64::try_from(secs).ok().and_then(Duration::try_seconds)
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Brute-force throttle settings.
    pub throttle: ThrottleConfig,
    /// Eviction strategy for the idempotency cache.
    pub cache: CachePolicy,
}

impl PipelineConfig {
    /// Parse from JSON. Missing sections and fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would disable or break a gate.
    pub fn validate(&self) -> Result<()> {
        self.throttle.validate()?;
        self.cache.validate()
    }
}

/// Sliding-window brute-force policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Window length in seconds.
    pub window_secs: u64,
    /// Failures within the window at which an address is blocked.
    pub max_failures: usize,
}

impl ThrottleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            return Err(OrdergateError::Configuration(
                "throttle.window_secs must be > 0".into(),
            ));
        }
        if duration_from_secs(self.window_secs).is_none() {
            return Err(OrdergateError::Configuration(format!(
                "throttle.window_secs {} too large",
                self.window_secs
            )));
        }
        if self.max_failures == 0 {
            return Err(OrdergateError::Configuration(
                "throttle.max_failures must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Window as a signed duration for timestamp arithmetic.
    #[must_use]
    pub fn window(&self) -> Duration {
        duration_from_secs(self.window_secs).unwrap_or(Duration::MAX)
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            window_secs: constants::DEFAULT_THROTTLE_WINDOW_SECS,
            max_failures: constants::DEFAULT_MAX_FAILURES,
        }
    }
}

/// How admitted fingerprints leave the idempotency cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePolicy {
    /// Keep every fingerprint forever.
    #[default]
    Unbounded,
    /// A fingerprint expires `ttl_secs` after admission; a later identical
    /// submission is admitted again.
    Ttl { ttl_secs: u64 },
    /// Keep at most `max_entries`; the oldest admission is evicted first.
    Capacity { max_entries: usize },
}

impl CachePolicy {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Unbounded => Ok(()),
            Self::Ttl { ttl_secs } => {
                if *ttl_secs == 0 || duration_from_secs(*ttl_secs).is_none() {
                    return Err(OrdergateError::Configuration(format!(
                        "cache.ttl_secs {ttl_secs} out of range"
                    )));
                }
                Ok(())
            }
            Self::Capacity { max_entries } => {
                if *max_entries == 0 {
                    return Err(OrdergateError::Configuration(
                        "cache.max_entries must be > 0".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}
