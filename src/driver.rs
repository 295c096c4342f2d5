use burn::tensor::backend::Backend;
use enum_map::EnumMap;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};

use crate::{
    charts::{ChartRenderer, LogRenderer},
    config::{DriverConfig, RenderMode},
    env::{EpisodeSummary, VecEnv},
    error::{RenderError, Result},
    gym::TradeAction,
    ppo::{ActorCritic, InferenceBackend, IterationStats, Policy, PpoTrainer, RandomPolicy},
    render::Renderer,
};

/// What a rollout of the primary environment looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceReport {
    pub steps: usize,
    /// Episodes of the primary env that finished during the rollout
    pub episodes: Vec<EpisodeSummary>,
    pub action_counts: EnumMap<TradeAction, usize>,
    /// Sum of every reward the primary env handed out
    pub total_reward: f64,
}

/// What `run` produced. `history` is empty when training was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub history: Vec<IterationStats>,
    pub report: InferenceReport,
}

pub fn make_renderer(
    config: &DriverConfig,
) -> std::result::Result<Option<Box<dyn Renderer>>, RenderError> {
    let renderer: Box<dyn Renderer> = match config.render {
        RenderMode::Chart => Box::new(ChartRenderer::new(&config.render_dir)?),
        RenderMode::Log => Box::new(LogRenderer::new()),
        RenderMode::None => return Ok(None),
    };
    Ok(Some(renderer))
}

/// Trains a fresh actor-critic for `config.timesteps` env steps.
pub fn train(
    config: &DriverConfig,
) -> Result<(ActorCritic<InferenceBackend>, Vec<IterationStats>)> {
    let mut trainer = PpoTrainer::new(config.ppo.clone(), config.seed)?;
    let mut envs = VecEnv::new(config.envs, None);

    let history = trainer.learn(&mut envs, config.timesteps);
    envs.close();

    if let Some(last) = history.last() {
        info!(
            iterations = history.len(),
            timesteps = last.timesteps,
            episodes = last.episodes,
            mean_episode_reward = ?last.mean_episode_reward,
            "training finished"
        );
    }

    #[cfg(feature = "debug_training")]
    record_progress(config, &history);

    Ok((trainer.into_policy(), history))
}

/// Charts are only drawn when inference renders charts too.
#[cfg(feature = "debug_training")]
fn record_progress(config: &DriverConfig, history: &[IterationStats]) {
    use tracing::warn;

    use crate::{charts::progress_chart, types::Data};

    if config.render != RenderMode::Chart {
        return;
    }

    let series: [(&str, Data); 3] = [
        (
            "mean_episode_reward",
            history.iter().filter_map(|stats| stats.mean_episode_reward).collect(),
        ),
        ("entropy", history.iter().map(|stats| stats.entropy).collect()),
        ("value_loss", history.iter().map(|stats| stats.value_loss).collect()),
    ];

    if let Err(err) = std::fs::create_dir_all(&config.render_dir) {
        warn!(
            dir = %config.render_dir.display(),
            %err,
            "unable to create training chart directory"
        );
        return;
    }
    for (name, data) in series {
        if let Err(err) = progress_chart(&config.render_dir, name, &data) {
            warn!(chart = name, %err, "unable to draw training chart");
        }
    }
}

/// Steps the vec env `config.infer_steps` times with `policy`, rendering the primary env
/// after every step.
pub fn infer<P: Policy>(policy: &P, config: &DriverConfig) -> Result<InferenceReport> {
    let mut envs = VecEnv::new(config.envs, make_renderer(config)?);
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let mut observations = envs.reset();

    let mut report = InferenceReport {
        steps: 0,
        episodes: Vec::new(),
        action_counts: EnumMap::default(),
        total_reward: 0.0,
    };

    info!(
        steps = config.infer_steps,
        deterministic = config.deterministic,
        "inference started"
    );

    for _ in 0..config.infer_steps {
        let actions: Vec<i64> = observations
            .iter()
            .map(|obs| policy.predict(obs, config.deterministic, &mut rng))
            .collect();
        if let Ok(action) = TradeAction::try_from(actions[0]) {
            report.action_counts[action] += 1;
        }

        let step = envs.step(&actions);
        report.steps += 1;
        report.total_reward += step.rewards[0];

        if let Some(summary) = step.finished[0] {
            info!(
                episode = report.episodes.len() + 1,
                reward = summary.reward,
                profit = summary.profit,
                length = summary.length,
                "episode finished"
            );
            report.episodes.push(summary);
        }

        observations = step.obs;
        envs.render()?;
    }

    envs.close();
    debug!(
        out = report.action_counts[TradeAction::Out],
        buy = report.action_counts[TradeAction::Buy],
        sell = report.action_counts[TradeAction::Sell],
        total_reward = report.total_reward,
        "inference finished"
    );

    Ok(report)
}

/// Infers without training. Models are not persisted, so the policy is either a
/// freshly initialised actor-critic or the uniform baseline.
pub fn infer_untrained(config: &DriverConfig, random: bool) -> Result<InferenceReport> {
    if random {
        return infer(&RandomPolicy, config);
    }

    InferenceBackend::seed(config.seed);
    infer(&ActorCritic::<InferenceBackend>::new(&Default::default()), config)
}

/// Train, then roll the trained policy out. With `random` training is skipped and the
/// uniform baseline is rolled out instead.
pub fn run(config: &DriverConfig, random: bool) -> Result<RunOutcome> {
    if random {
        let report = infer(&RandomPolicy, config)?;
        return Ok(RunOutcome {
            history: Vec::new(),
            report,
        });
    }

    let (policy, history) = train(config)?;
    let report = infer(&policy, config)?;
    Ok(RunOutcome { history, report })
}
