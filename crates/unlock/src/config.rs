//! Timing configuration for host polling.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Interval between checks for the host audio subsystem.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Hard deadline after which polling stops, measured from installer start.
pub const DEFAULT_DEADLINE_MS: u64 = 30_000;

/// Attempt bound matching the default deadline and interval.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = (DEFAULT_DEADLINE_MS / DEFAULT_POLL_INTERVAL_MS) as u32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("deadline ({deadline_ms}ms) is shorter than the poll interval ({interval_ms}ms)")]
    DeadlineShorterThanInterval { deadline_ms: u64, interval_ms: u64 },

    #[error("max poll attempts must be greater than zero")]
    ZeroAttempts,
}

/// Configuration for the unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockConfig {
    /// Interval between host subsystem checks.
    pub poll_interval_ms: u64,
    /// Watchdog deadline for the whole polling cycle.
    pub deadline_ms: u64,
    /// Polling stops after this many unsuccessful checks even if the deadline
    /// has not passed.
    pub max_poll_attempts: u32,
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            deadline_ms: DEFAULT_DEADLINE_MS,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl UnlockConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.deadline_ms < self.poll_interval_ms {
            return Err(ConfigError::DeadlineShorterThanInterval {
                deadline_ms: self.deadline_ms,
                interval_ms: self.poll_interval_ms,
            });
        }
        if self.max_poll_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UnlockConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.deadline(), Duration::from_secs(30));
        assert_eq!(config.max_poll_attempts, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: UnlockConfig = serde_json::from_str(r#"{"deadline_ms": 5000}"#).unwrap();
        assert_eq!(config.deadline_ms, 5000);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.max_poll_attempts, DEFAULT_MAX_POLL_ATTEMPTS);
    }

    #[test]
    fn test_validate_rejects_bad_timing() {
        let zero = UnlockConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(zero.validate(), Err(ConfigError::ZeroPollInterval));

        let short = UnlockConfig {
            deadline_ms: 50,
            ..Default::default()
        };
        assert!(matches!(
            short.validate(),
            Err(ConfigError::DeadlineShorterThanInterval { .. })
        ));

        let no_attempts = UnlockConfig {
            max_poll_attempts: 0,
            ..Default::default()
        };
        assert_eq!(no_attempts.validate(), Err(ConfigError::ZeroAttempts));
    }
}
