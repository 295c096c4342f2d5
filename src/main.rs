use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use static_market_rl::{
    config::{DriverConfig, RenderMode},
    driver::{self, InferenceReport},
    gym::TradeAction,
    logging::init_logging,
};

#[derive(Parser)]
#[command(name = "static_market_rl")]
#[command(
    about = "PPO training and inference on a deterministic oscillating market",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML file layered over the defaults, before MARKET_RL_* variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Training budget in env steps
    #[arg(short, long, global = true)]
    timesteps: Option<usize>,

    /// Inference rollout length
    #[arg(short, long, global = true)]
    steps: Option<usize>,

    #[arg(short, long, global = true)]
    envs: Option<usize>,

    #[arg(long, global = true)]
    seed: Option<u64>,

    #[arg(short, long, value_enum, global = true)]
    render: Option<RenderMode>,

    #[arg(long, global = true)]
    render_dir: Option<PathBuf>,

    /// Roll out a uniform random policy instead of the actor-critic. Skips training for `run`
    #[arg(long, default_value_t = false, global = true)]
    random: bool,

    /// Sample actions during inference instead of taking the argmax
    #[arg(long, default_value_t = false, global = true)]
    stochastic: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
enum Commands {
    /// Train, then run inference with the trained policy
    Run,
    /// Train only
    Train,
    /// Run inference with an untrained or random policy
    Infer,
}

impl Cli {
    /// Defaults to `run`. `--random` has nothing to roll out under `train`.
    fn command(&self) -> anyhow::Result<Commands> {
        let command = self.command.unwrap_or(Commands::Run);
        if self.random && command == Commands::Train {
            anyhow::bail!("--random only applies to run and infer");
        }
        Ok(command)
    }

    fn driver_config(&self) -> anyhow::Result<DriverConfig> {
        let mut config =
            DriverConfig::load(self.config.as_deref()).context("loading configuration")?;

        if let Some(timesteps) = self.timesteps {
            config.timesteps = timesteps;
        }
        if let Some(steps) = self.steps {
            config.infer_steps = steps;
        }
        if let Some(envs) = self.envs {
            config.envs = envs;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(render) = self.render {
            config.render = render;
        }
        if let Some(render_dir) = &self.render_dir {
            config.render_dir = render_dir.clone();
        }
        if self.stochastic {
            config.deterministic = false;
        }

        config.validate().context("validating command line overrides")?;
        Ok(config)
    }
}

fn print_report(report: &InferenceReport) {
    println!(
        "{} steps, {} finished episodes, total reward {:.4}",
        report.steps,
        report.episodes.len(),
        report.total_reward
    );
    for (index, episode) in report.episodes.iter().enumerate() {
        println!(
            "episode {} - reward {:.4}, profit {:.4}",
            index + 1,
            episode.reward,
            episode.profit
        );
    }
    for action in [TradeAction::Out, TradeAction::Buy, TradeAction::Sell] {
        println!("{}: {}", action.label(), report.action_counts[action]);
    }
}

fn main() -> anyhow::Result<()> {
    println!("{}", "Start".green());

    init_logging();
    let cli = Cli::parse();
    let command = cli.command()?;
    let config = cli.driver_config()?;

    match command {
        Commands::Run => {
            let outcome = driver::run(&config, cli.random)?;
            if !outcome.history.is_empty() {
                println!("{} training iterations", outcome.history.len());
            }
            print_report(&outcome.report);
        }
        Commands::Train => {
            let (_, history) = driver::train(&config)?;
            if let Some(last) = history.last() {
                println!(
                    "{} iterations, mean episode reward {:?}",
                    history.len(),
                    last.mean_episode_reward
                );
            }
        }
        Commands::Infer => {
            let report = driver::infer_untrained(&config, cli.random)?;
            print_report(&report);
        }
    }

    println!("{}", "End".green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_the_default_command() {
        let cli = Cli::try_parse_from(["static_market_rl"]).expect("parse");

        assert_eq!(cli.command().expect("command"), Commands::Run);
    }

    #[test]
    fn random_is_rejected_for_train() {
        let cli = Cli::try_parse_from(["static_market_rl", "train", "--random"]).expect("parse");

        assert!(cli.command().is_err());
    }

    #[test]
    fn random_is_accepted_for_run_and_infer() {
        for command in ["run", "infer"] {
            let cli =
                Cli::try_parse_from(["static_market_rl", command, "--random"]).expect("parse");

            assert!(cli.command().is_ok(), "{command}");
        }
    }

    #[test]
    fn overrides_land_in_the_driver_config() {
        let cli = Cli::try_parse_from([
            "static_market_rl",
            "infer",
            "--steps",
            "7",
            "--render",
            "none",
            "--stochastic",
        ])
        .expect("parse");

        let config = cli.driver_config().expect("config");

        assert_eq!(config.infer_steps, 7);
        assert_eq!(config.render, RenderMode::None);
        assert!(!config.deterministic);
    }
}
