//! Configuration types

use crate::{ConfigError, HierarchError, HierarchResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default staleness threshold for pending/running tasks (1 hour).
pub const DEFAULT_STALE_AFTER_SECS: u64 = 3600;

/// Default upper bound on reasoning steps per task.
pub const DEFAULT_MAX_REASONING_STEPS: usize = 1024;

/// Orchestration policy knobs.
///
/// None of these settings starts a timer or a background job: the staleness
/// threshold only drives the `stale_tasks` report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchConfig {
    /// How long a pending/running task may go without activity before it is
    /// reported as stale.
    pub stale_after: Duration,
    /// Allow `complete`/`fail` straight from `pending` (zero-step tasks).
    pub allow_zero_step_completion: bool,
    /// Append rejected veto attempts to the task's violations log.
    pub record_rejected_vetoes: bool,
    /// Maximum reasoning steps a single task may accumulate.
    pub max_reasoning_steps: usize,
}

impl Default for HierarchConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER_SECS),
            allow_zero_step_completion: false,
            record_rejected_vetoes: true,
            max_reasoning_steps: DEFAULT_MAX_REASONING_STEPS,
        }
    }
}

impl HierarchConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `HIERARCH_STALE_AFTER_SECS`: staleness threshold (default: 3600)
    /// - `HIERARCH_ALLOW_ZERO_STEP_COMPLETION`: "true" or "false" (default: false)
    /// - `HIERARCH_RECORD_REJECTED_VETOES`: "true" or "false" (default: true)
    /// - `HIERARCH_MAX_REASONING_STEPS`: per-task step cap (default: 1024)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let stale_after = std::env::var("HIERARCH_STALE_AFTER_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.stale_after);

        let allow_zero_step_completion = std::env::var("HIERARCH_ALLOW_ZERO_STEP_COMPLETION")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(defaults.allow_zero_step_completion);

        let record_rejected_vetoes = std::env::var("HIERARCH_RECORD_REJECTED_VETOES")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(defaults.record_rejected_vetoes);

        let max_reasoning_steps = std::env::var("HIERARCH_MAX_REASONING_STEPS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_reasoning_steps);

        Self {
            stale_after,
            allow_zero_step_completion,
            record_rejected_vetoes,
            max_reasoning_steps,
        }
    }

    /// Set the staleness threshold.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Allow or forbid zero-step completion.
    pub fn with_zero_step_completion(mut self, allow: bool) -> Self {
        self.allow_zero_step_completion = allow;
        self
    }

    /// Toggle audit recording of rejected vetoes.
    pub fn with_rejected_veto_recording(mut self, record: bool) -> Self {
        self.record_rejected_vetoes = record;
        self
    }

    /// Set the per-task reasoning step cap.
    pub fn with_max_reasoning_steps(mut self, max: usize) -> Self {
        self.max_reasoning_steps = max;
        self
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(HierarchError::Config) if invalid.
    pub fn validate(&self) -> HierarchResult<()> {
        if self.stale_after.is_zero() {
            return Err(HierarchError::Config(ConfigError::InvalidValue {
                field: "stale_after".to_string(),
                value: format!("{:?}", self.stale_after),
                reason: "stale_after must be positive".to_string(),
            }));
        }

        if self.max_reasoning_steps == 0 {
            return Err(HierarchError::Config(ConfigError::InvalidValue {
                field: "max_reasoning_steps".to_string(),
                value: self.max_reasoning_steps.to_string(),
                reason: "max_reasoning_steps must be greater than 0".to_string(),
            }));
        }

        if u32::try_from(self.max_reasoning_steps).is_err() {
            return Err(HierarchError::Config(ConfigError::InvalidValue {
                field: "max_reasoning_steps".to_string(),
                value: self.max_reasoning_steps.to_string(),
                reason: format!("max_reasoning_steps must not exceed {}", u32::MAX),
            }));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HierarchConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.allow_zero_step_completion);
        assert!(config.record_rejected_vetoes);
    }

    #[test]
    fn test_zero_stale_after_rejected() {
        let config = HierarchConfig::default().with_stale_after(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            HierarchError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "stale_after"
        ));
    }

    #[test]
    fn test_zero_step_cap_rejected() {
        let config = HierarchConfig::default().with_max_reasoning_steps(0);
        assert!(config.validate().is_err());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_step_cap_fits_step_numbers() {
        let config = HierarchConfig::default().with_max_reasoning_steps(u32::MAX as usize);
        assert!(config.validate().is_ok());

        let config = HierarchConfig::default().with_max_reasoning_steps(u32::MAX as usize + 1);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            HierarchError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "max_reasoning_steps"
        ));
    }
}
