use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// PPO hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpoConfig {
    pub learning_rate: f64,
    /// Steps collected per env before each update
    pub n_steps: usize,
    /// Minibatch size
    pub batch_size: usize,
    /// Passes over the rollout per update
    pub n_epochs: usize,
    /// Discount factor
    pub gamma: f64,
    pub gae_lambda: f64,
    pub clip_range: f64,
    /// Entropy bonus coefficient
    pub ent_coef: f64,
    /// Value loss coefficient
    pub vf_coef: f64,
    pub max_grad_norm: f64,
    /// Stop the epoch loop early once the approximate KL exceeds 1.5x this value
    pub target_kl: Option<f64>,
    pub normalize_advantage: bool,
}

impl Default for PpoConfig {
    fn default() -> Self {
        Self {
            learning_rate: 3e-4,
            n_steps: 2048,
            batch_size: 64,
            n_epochs: 10,
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_range: 0.2,
            ent_coef: 0.0,
            vf_coef: 0.5,
            max_grad_norm: 0.5,
            target_kl: None,
            normalize_advantage: true,
        }
    }
}

impl PpoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.learning_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.n_steps == 0 || self.batch_size == 0 || self.n_epochs == 0 {
            return Err(ConfigError::Invalid(
                "n_steps, batch_size and n_epochs must all be non-zero".to_string(),
            ));
        }
        // Advantage normalisation needs at least two samples per minibatch
        if self.normalize_advantage && self.batch_size < 2 {
            return Err(ConfigError::Invalid(
                "batch_size must be at least 2 when normalize_advantage is set".to_string(),
            ));
        }
        for (name, value) in [("gamma", self.gamma), ("gae_lambda", self.gae_lambda)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{name} must lie in [0, 1], got {value}")));
            }
        }
        if !(self.clip_range > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "clip_range must be positive, got {}",
                self.clip_range
            )));
        }
        if self.ent_coef < 0.0 || self.vf_coef < 0.0 || !(self.max_grad_norm > 0.0) {
            return Err(ConfigError::Invalid(
                "ent_coef and vf_coef must be non-negative and max_grad_norm positive".to_string(),
            ));
        }
        if let Some(target_kl) = self.target_kl {
            if !(target_kl > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "target_kl must be positive, got {target_kl}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PpoConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.n_steps, 2048);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.target_kl, None);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let zero_batch = PpoConfig {
            batch_size: 0,
            ..PpoConfig::default()
        };
        let bad_gamma = PpoConfig {
            gamma: 1.5,
            ..PpoConfig::default()
        };
        let nan_lr = PpoConfig {
            learning_rate: f64::NAN,
            ..PpoConfig::default()
        };

        for config in [zero_batch, bad_gamma, nan_lr] {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }
}
