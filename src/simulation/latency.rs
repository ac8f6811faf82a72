//! Simulated processing latency for exchanges.
//!
//! Every exchange waits for a sample drawn from a normal distribution,
//! clamped to `[0, MAX_DELAY_SECS]`. This models processing time only; it applies no
//! backpressure and never queues work.

use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::time::Duration;
use thiserror::Error;

/// Upper bound for the configured mean and spread and for any single delay.
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Latency parameters, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Whether exchanges sleep at all.
    pub enabled: bool,
    /// Mean of the delay distribution.
    pub mean_secs: f64,
    /// Standard deviation of the delay distribution. Zero means a constant delay.
    pub std_dev_secs: f64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mean_secs: 3.0,
            std_dev_secs: 2.0,
        }
    }
}

impl LatencyConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LatencyError {
    #[error("latency mean must be between 0 and 3600 seconds, got {0}")]
    InvalidMean(f64),
    #[error("latency standard deviation must be between 0 and 3600 seconds, got {0}")]
    InvalidStdDev(f64),
}

#[derive(Debug, Clone)]
enum Shape {
    None,
    Constant(f64),
    Gaussian(Normal),
}

/// Samples per-exchange processing delays.
#[derive(Debug, Clone)]
pub struct LatencyModel {
    shape: Shape,
}

impl LatencyModel {
    /// No delay at all.
    pub fn none() -> Self {
        Self { shape: Shape::None }
    }

    /// Build a model from its configuration.
    pub fn from_config(config: &LatencyConfig) -> Result<Self, LatencyError> {
        if !config.enabled {
            return Ok(Self::none());
        }
        if !in_range(config.mean_secs) {
            return Err(LatencyError::InvalidMean(config.mean_secs));
        }
        if !in_range(config.std_dev_secs) {
            return Err(LatencyError::InvalidStdDev(config.std_dev_secs));
        }
        if config.std_dev_secs == 0.0 {
            return Ok(Self {
                shape: Shape::Constant(config.mean_secs),
            });
        }
        let normal = Normal::new(config.mean_secs, config.std_dev_secs)
            .map_err(|_| LatencyError::InvalidStdDev(config.std_dev_secs))?;
        Ok(Self {
            shape: Shape::Gaussian(normal),
        })
    }

    pub fn is_none(&self) -> bool {
        matches!(self.shape, Shape::None)
    }

    /// Draw one delay using the given RNG.
    pub fn sample_with<R: Rng>(&self, rng: &mut R) -> Duration {
        let secs = match &self.shape {
            Shape::None => 0.0,
            Shape::Constant(secs) => *secs,
            Shape::Gaussian(normal) => rng.sample(normal),
        };
        if !secs.is_finite() {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS)).unwrap_or(Duration::ZERO)
    }

    /// Draw one delay from the thread-local RNG.
    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::thread_rng())
    }
}

fn in_range(secs: f64) -> bool {
    secs.is_finite() && (0.0..=MAX_DELAY_SECS).contains(&secs)
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self::none()
    }
}
