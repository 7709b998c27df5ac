//! User education: admission and scheduling of in-product feature promos.
//!
//! Notes for the embedding browser:
//!  - The queue is single-sequence. Own it from one place (typically the
//!    promo controller) and drive it from that sequence only.
//!  - Failure callbacks are posted to a [`sequence::TaskSequence`]. Drain it
//!    from the same event loop that drives the queue, e.g. by calling
//!    `run_until_idle()` after each scan or awaiting `run_next()`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub mod feature_promo;
pub mod sequence;
pub mod time;

pub use crate::feature_promo::{
    EligibleFeaturePromo, Failure, FeatureId, FeaturePromoParams, FeaturePromoQueue,
    FeaturePromoResult, FeaturePromoSpecification, PreconditionList, PreconditionListProvider,
};

#[derive(Error, Debug)]
pub enum UserEducationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

pub type Result<T> = std::result::Result<T, UserEducationError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("feature {0} is not queued")]
    NotQueued(FeatureId),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Queue timeout must be positive")]
    InvalidTimeout,
}

/// Tunables for [`FeaturePromoQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// How long a request may wait for its wait-for preconditions before it
    /// is dropped.
    #[serde(rename = "queue_timeout_ms", with = "duration_ms")]
    pub queue_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_timeout: Duration::from_secs(10),
        }
    }
}

impl QueueConfig {
    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.queue_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
