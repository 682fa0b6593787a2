//! Invitation configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::InvitationPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct InvitationConfig {
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,

    #[serde(default = "default_max_code_attempts")]
    pub max_code_attempts: u32,

    /// Period of the background expiry sweep; 0 disables it
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl InvitationConfig {
    /// `None` when the sweep is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=365).contains(&self.expiry_days) {
            return Err(ValidationError::InvalidExpiry);
        }
        if self.max_code_attempts == 0 {
            return Err(ValidationError::InvalidCodeAttempts);
        }
        Ok(())
    }
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            expiry_days: default_expiry_days(),
            max_code_attempts: default_max_code_attempts(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl From<&InvitationConfig> for InvitationPolicy {
    fn from(config: &InvitationConfig) -> Self {
        InvitationPolicy {
            expiry_days: config.expiry_days,
            max_code_attempts: config.max_code_attempts,
        }
    }
}

fn default_expiry_days() -> i64 {
    7
}

fn default_max_code_attempts() -> u32 {
    10
}

fn default_sweep_interval() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy_defaults() {
        let policy = InvitationPolicy::from(&InvitationConfig::default());
        assert_eq!(policy.expiry_days, InvitationPolicy::default().expiry_days);
        assert_eq!(policy.max_code_attempts, InvitationPolicy::default().max_code_attempts);
    }

    #[test]
    fn zero_interval_disables_sweep() {
        let config = InvitationConfig {
            sweep_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.sweep_interval().is_none());
    }

    #[test]
    fn expiry_out_of_range_rejected() {
        for days in [0, -1, 366] {
            let config = InvitationConfig {
                expiry_days: days,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ValidationError::InvalidExpiry)));
        }
    }
}
