use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RaftError;

/// Timing knobs of a node, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaftConfig {
    pub heartbeat_interval: u64,
    pub election_timeout_min: u64,
    pub election_timeout_max: u64,
    /// How long a node with no peers stays candidate before leading alone.
    pub bootstrap_delay: u64,
}

impl Default for RaftConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: 50,
            election_timeout_min: 150,
            election_timeout_max: 300,
            bootstrap_delay: 1000,
        }
    }
}

impl RaftConfig {
    pub fn new(heartbeat_interval: u64, election_timeout_min: u64, election_timeout_max: u64) -> Self {
        Self {
            heartbeat_interval,
            election_timeout_min,
            election_timeout_max,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RaftError> {
        if self.heartbeat_interval == 0 {
            return Err(RaftError::InvalidConfig(
                "heartbeat_interval must be positive".to_string(),
            ));
        }
        if self.election_timeout_min == 0 {
            return Err(RaftError::InvalidConfig(
                "election_timeout_min must be positive".to_string(),
            ));
        }
        if self.election_timeout_min > self.election_timeout_max {
            return Err(RaftError::InvalidConfig(format!(
                "election timeout bounds are inverted: {} > {}",
                self.election_timeout_min, self.election_timeout_max
            )));
        }
        Ok(())
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval)
    }

    pub fn election_timeout_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.election_timeout_min),
            Duration::from_millis(self.election_timeout_max),
        )
    }

    pub fn bootstrap(&self) -> Duration {
        Duration::from_millis(self.bootstrap_delay)
    }

    /// Timeout hint attached to every outbound protocol message.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.election_timeout_min) / 2
    }
}
