use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        driver::{ENV_COUNT, ENV_PREFIX, INFER_STEPS, SEED, TRAIN_TIMESTEPS},
        files::RENDER_PATH,
    },
    error::ConfigError,
    ppo::PpoConfig,
};

/// Where inference frames go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Redraw a PNG chart every step
    #[default]
    Chart,
    /// Log each frame
    Log,
    None,
}

/// Everything the train and infer flows need, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub ppo: PpoConfig,
    /// Number of environment copies in the vec env
    pub envs: usize,
    /// Training budget in env steps, summed over envs
    pub timesteps: usize,
    /// Rollout length for inference
    pub infer_steps: usize,
    pub seed: u64,
    pub render: RenderMode,
    pub render_dir: PathBuf,
    /// Argmax actions during inference instead of sampling
    pub deterministic: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            ppo: PpoConfig::default(),
            envs: ENV_COUNT,
            timesteps: TRAIN_TIMESTEPS,
            infer_steps: INFER_STEPS,
            seed: SEED,
            render: RenderMode::default(),
            render_dir: PathBuf::from(RENDER_PATH),
            deterministic: true,
        }
    }
}

impl DriverConfig {
    /// Defaults, then `file` if given, then `MARKET_RL_*` environment variables.
    /// Nested keys use `__`, e.g. `MARKET_RL_PPO__N_STEPS`.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(file, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(file: Option<&Path>, environment: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file));
        }
        builder = builder.add_source(
            environment
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.envs == 0 {
            return Err(ConfigError::Invalid("envs must be at least 1".to_string()));
        }
        self.ppo.validate()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(config::Map::new()))
    }

    #[test]
    fn empty_sources_give_the_defaults() {
        let config = DriverConfig::load_with(None, no_env()).expect("config");

        assert_eq!(config, DriverConfig::default());
        assert_eq!(config.render, RenderMode::Chart);
        assert_eq!(config.timesteps, 10_000);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("market.toml");
        fs::write(
            &path,
            "envs = 4\nrender = \"log\"\n\n[ppo]\nn_steps = 128\nlearning_rate = 0.001\n",
        )
        .expect("write config");

        let config = DriverConfig::load_with(Some(&path), no_env()).expect("config");

        assert_eq!(config.envs, 4);
        assert_eq!(config.render, RenderMode::Log);
        assert_eq!(config.ppo.n_steps, 128);
        assert_eq!(config.ppo.learning_rate, 0.001);
        assert_eq!(config.ppo.batch_size, 64);
    }

    #[test]
    fn environment_overrides_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("market.toml");
        fs::write(&path, "seed = 1\n").expect("write config");

        let vars = config::Map::from([
            ("MARKET_RL_SEED".to_string(), "9".to_string()),
            ("MARKET_RL_PPO__N_EPOCHS".to_string(), "3".to_string()),
        ]);
        let environment = Environment::with_prefix(ENV_PREFIX).source(Some(vars));

        let config = DriverConfig::load_with(Some(&path), environment).expect("config");

        assert_eq!(config.seed, 9);
        assert_eq!(config.ppo.n_epochs, 3);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("market.toml");
        fs::write(&path, "envs = 0\n").expect("write config");

        let result = DriverConfig::load_with(Some(&path), no_env());

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
