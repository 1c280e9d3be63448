//! Engine Configuration
//!
//! Parameter records with their production defaults and load-time
//! validation. Validation is for the enclosing application's configuration
//! path; the algorithms themselves degrade gracefully and never return
//! errors.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("validation error: {0}")]
    Validation(String),
}

/// Base knowledge-tracing parameters for one (learner, skill) pair.
///
/// `p_lapse` is part of the persisted parameterization but is not read by
/// the update rule.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TracerParams {
    /// Probability the skill is known before any interaction
    pub p_init: f64,
    /// Probability of learning the skill per opportunity
    pub p_transit: f64,
    /// Probability of erring despite mastery
    pub p_slip: f64,
    /// Probability of guessing correctly despite non-mastery
    pub p_guess: f64,
    /// Probability of forgetting a mastered skill
    pub p_lapse: f64,
}

impl Default for TracerParams {
    fn default() -> Self {
        Self {
            p_init: 0.15,
            p_transit: 0.12,
            p_slip: 0.20,
            p_guess: 0.08,
            p_lapse: 0.30,
        }
    }
}

impl TracerParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("p_init", self.p_init),
            ("p_transit", self.p_transit),
            ("p_slip", self.p_slip),
            ("p_guess", self.p_guess),
            ("p_lapse", self.p_lapse),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be a probability in [0, 1], got {value}"
                )));
            }
        }
        if self.p_slip + self.p_guess >= 1.0 {
            return Err(ConfigError::Validation(format!(
                "p_slip + p_guess must stay below 1.0, got {}",
                self.p_slip + self.p_guess
            )));
        }
        Ok(())
    }
}

/// Self-calibration settings persisted with each knowledge state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdaptivityConfig {
    /// Per-learner base learning rate carried with the record
    pub learning_rate: f64,
    /// Minimum observations before metrics and adjustments are recomputed
    pub adaptivity_threshold: u32,
    /// Step size of the parameter adjustments
    pub adaptation_rate: f64,
}

impl Default for AdaptivityConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.03,
            adaptivity_threshold: 12,
            adaptation_rate: 0.03,
        }
    }
}

impl AdaptivityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !self.adaptation_rate.is_finite() || self.adaptation_rate <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "adaptation_rate must be positive, got {}",
                self.adaptation_rate
            )));
        }
        if self.adaptivity_threshold == 0 {
            return Err(ConfigError::Validation(
                "adaptivity_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Question-scheduling configuration for one learner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Base of the streak-scaled ideal spacing between presentations
    pub spacing_factor: f64,
    /// Priority multiplier for items the learner last missed
    pub error_priority: f64,
    /// Mastery reduction factor when a previously-correct item is missed
    pub knowledge_penalty: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            spacing_factor: 2.5,
            error_priority: 0.85,
            knowledge_penalty: 0.35,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.spacing_factor.is_finite() || self.spacing_factor < 1.0 {
            return Err(ConfigError::Validation(format!(
                "spacing_factor must be at least 1.0, got {}",
                self.spacing_factor
            )));
        }
        if !self.error_priority.is_finite() || !(0.0..=1.0).contains(&self.error_priority)
            || self.error_priority == 0.0
        {
            return Err(ConfigError::Validation(format!(
                "error_priority must be in (0, 1], got {}",
                self.error_priority
            )));
        }
        if !self.knowledge_penalty.is_finite() || !(0.0..=1.0).contains(&self.knowledge_penalty) {
            return Err(ConfigError::Validation(format!(
                "knowledge_penalty must be in [0, 1], got {}",
                self.knowledge_penalty
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(TracerParams::default().validate().is_ok());
        assert!(AdaptivityConfig::default().validate().is_ok());
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_probability_rejected() {
        let params = TracerParams {
            p_slip: 1.2,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = TracerParams {
            p_guess: f64::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_degenerate_slip_guess_pair_rejected() {
        let params = TracerParams {
            p_slip: 0.6,
            p_guess: 0.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_scheduler_bounds() {
        let config = SchedulerConfig {
            spacing_factor: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SchedulerConfig {
            error_priority: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SchedulerConfig {
            knowledge_penalty: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = AdaptivityConfig {
            adaptivity_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
