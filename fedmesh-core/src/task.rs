//! Per-task configuration
//!
//! A task describes one collaborative training effort: how many peers must
//! be present before weights are exchanged, how often the protocol re-checks
//! for them, and which privacy parameters apply.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Interval between re-checks while waiting on peers
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Wait bound integrators may pass as `round_timeout`; rounds are unbounded
/// by default.
pub const SUGGESTED_ROUND_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum peer count before a round may proceed
pub const DEFAULT_QUORUM: usize = 3;

/// Configuration for one collaborative training task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Task identifier, shared by all participants of the effort
    pub task_id: String,
    /// Minimum number of peers required before broadcasting and before
    /// aggregating. Must be at least 1.
    pub quorum: usize,
    /// Interval between quorum re-checks
    pub poll_interval: Duration,
    /// Bound on each quorum wait. `None` waits indefinitely.
    pub round_timeout: Option<Duration>,
    /// Standard deviation of the Gaussian noise added to shared updates
    pub noise_scale: Option<f32>,
    /// L2 bound applied to the update before noise
    pub clipping_radius: Option<f32>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            task_id: String::from("default"),
            quorum: DEFAULT_QUORUM,
            poll_interval: DEFAULT_POLL_INTERVAL,
            round_timeout: None,
            noise_scale: None,
            clipping_radius: None,
        }
    }
}

impl TaskConfig {
    /// Create a configuration for the named task with default settings
    pub fn named(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.quorum < 1 {
            return Err(Error::InvalidConfig("quorum must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll interval must be non-zero"));
        }
        if let Some(radius) = self.clipping_radius {
            if !(radius > 0.0) {
                return Err(Error::InvalidConfig("clipping radius must be positive"));
            }
        }
        if let Some(scale) = self.noise_scale {
            if !(scale >= 0.0) {
                return Err(Error::InvalidConfig("noise scale must be non-negative"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TaskConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_quorum_is_rejected() {
        let config = TaskConfig {
            quorum: 0,
            ..TaskConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig("quorum must be at least 1"))
        ));
    }

    #[test]
    fn nan_clipping_radius_is_rejected() {
        let config = TaskConfig {
            clipping_radius: Some(f32::NAN),
            ..TaskConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn json_round_trip() {
        let config = TaskConfig {
            task_id: String::from("mnist"),
            quorum: 5,
            noise_scale: Some(0.1),
            ..TaskConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: TaskConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.task_id, "mnist");
        assert_eq!(back.quorum, 5);
        assert_eq!(back.noise_scale, Some(0.1));
    }
}
