use std::collections::VecDeque;

use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::Backend, ElementConversion, Int, Tensor, TensorData},
};
use enum_map::EnumMap;
use ndarray::Array1;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::{debug, info};

use crate::{
    constants::ppo::{ADAM_EPS, ADVANTAGE_EPS},
    env::VecEnv,
    error::ConfigError,
    gym::TradeAction,
};

use super::{
    buffer::{Minibatch, RolloutBuffer},
    config::PpoConfig,
    model::{ActorCritic, InferenceBackend, TrainingBackend},
    policy::features,
};

/// Episode returns kept for the running mean
const EPISODE_WINDOW: usize = 100;

/// Summary of one collect-then-update iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationStats {
    pub iteration: usize,
    /// Env steps taken so far, across all envs
    pub timesteps: usize,
    /// Mean return of the last finished episodes, `None` before the first one ends
    pub mean_episode_reward: Option<f64>,
    pub episodes: usize,
    pub policy_loss: f64,
    pub value_loss: f64,
    pub entropy: f64,
    pub approx_kl: f64,
    pub clip_fraction: f64,
    pub explained_variance: f64,
    pub epochs: usize,
    pub action_counts: EnumMap<TradeAction, usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct LossTerms {
    policy_loss: f64,
    value_loss: f64,
    entropy: f64,
    approx_kl: f64,
    clip_fraction: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct UpdateStats {
    policy_loss: f64,
    value_loss: f64,
    entropy: f64,
    approx_kl: f64,
    clip_fraction: f64,
    epochs: usize,
}

/// A minibatch moved onto a backend.
struct BatchTensors<B: Backend> {
    observations: Tensor<B, 2>,
    /// `[batch, 1]`, ready for `gather`
    actions: Tensor<B, 2, Int>,
    old_log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    returns: Tensor<B, 1>,
}

fn floats<B: Backend>(values: &Array1<f64>, device: &B::Device) -> Tensor<B, 1> {
    let data: Vec<f32> = values.iter().map(|value| *value as f32).collect();
    let len = data.len();
    Tensor::from_data(TensorData::new(data, [len]).convert::<B::FloatElem>(), device)
}

impl<B: Backend> BatchTensors<B> {
    fn new(batch: &Minibatch, normalize_advantage: bool, device: &B::Device) -> Self {
        let advantages = if normalize_advantage {
            normalize(&batch.advantages)
        } else {
            batch.advantages.clone()
        };
        let actions: Vec<i64> = batch.actions.iter().map(|action| *action as i64).collect();
        let actions = TensorData::new(actions, [batch.len(), 1]).convert::<B::IntElem>();

        Self {
            observations: features(&batch.observations, device),
            actions: Tensor::from_data(actions, device),
            old_log_probs: floats(&batch.old_log_probs, device),
            advantages: floats(&advantages, device),
            returns: floats(&batch.returns, device),
        }
    }
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f64 {
    tensor.into_scalar().elem::<f64>()
}

/// Clipped surrogate plus `vf_coef` times the value MSE, minus `ent_coef` times the entropy.
fn ppo_loss<B: Backend>(
    model: &ActorCritic<B>,
    batch: BatchTensors<B>,
    config: &PpoConfig,
) -> (Tensor<B, 1>, LossTerms) {
    let clip = config.clip_range;

    let log_probs_all = model.log_probs(batch.observations.clone());
    let probs = log_probs_all.clone().exp();
    let log_probs: Tensor<B, 1> = log_probs_all.clone().gather(1, batch.actions).squeeze(1);

    let log_ratio = log_probs - batch.old_log_probs;
    let ratio = log_ratio.clone().exp();

    let surr1 = ratio.clone() * batch.advantages.clone();
    let surr2 = ratio.clone().clamp(1.0 - clip, 1.0 + clip) * batch.advantages;
    let surrogate = surr2.clone().mask_where(surr1.clone().lower_equal(surr2), surr1);
    let policy_loss = surrogate.mean().neg();

    let entropy = (probs * log_probs_all).sum_dim(1).mean().neg();

    let values = model.values(batch.observations);
    let value_loss = (values - batch.returns).powf_scalar(2.0).mean();

    let loss = policy_loss.clone() + value_loss.clone().mul_scalar(config.vf_coef)
        - entropy.clone().mul_scalar(config.ent_coef);

    let approx_kl = (ratio.clone().sub_scalar(1.0) - log_ratio).mean();
    let clip_fraction = ratio.sub_scalar(1.0).abs().greater_elem(clip).float().mean();

    let terms = LossTerms {
        policy_loss: scalar(policy_loss),
        value_loss: scalar(value_loss),
        entropy: scalar(entropy),
        approx_kl: scalar(approx_kl),
        clip_fraction: scalar(clip_fraction),
    };
    (loss, terms)
}

/// Normalises with the unbiased standard deviation. Single-sample batches are left alone.
fn normalize(advantages: &Array1<f64>) -> Array1<f64> {
    if advantages.len() < 2 {
        return advantages.clone();
    }

    let mean = advantages.mean().unwrap_or(0.0);
    let std = advantages.std(1.0);
    advantages.mapv(|a| (a - mean) / (std + ADVANTAGE_EPS))
}

fn explained_variance(values: &[f64], returns: &[f64]) -> f64 {
    let returns = Array1::from(returns.to_vec());
    let residuals = &returns - &Array1::from(values.to_vec());

    let var_returns = returns.var(0.0);
    if var_returns == 0.0 {
        return f64::NAN;
    }
    1.0 - residuals.var(0.0) / var_returns
}

/// Proximal Policy Optimization over a `VecEnv` of market environments.
///
/// Adam moments live for one `learn` call.
pub struct PpoTrainer {
    config: PpoConfig,
    model: ActorCritic<TrainingBackend>,
    device: <TrainingBackend as Backend>::Device,
    rng: StdRng,
    episode_rewards: VecDeque<f64>,
    episodes: usize,
    num_timesteps: usize,
}

impl PpoTrainer {
    pub fn new(config: PpoConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;

        TrainingBackend::seed(seed);
        let device = Default::default();

        Ok(Self {
            config,
            model: ActorCritic::new(&device),
            device,
            rng: StdRng::seed_from_u64(seed),
            episode_rewards: VecDeque::with_capacity(EPISODE_WINDOW),
            episodes: 0,
            num_timesteps: 0,
        })
    }

    /// Copy of the current networks without the autodiff graph.
    pub fn policy(&self) -> ActorCritic<InferenceBackend> {
        self.model.valid()
    }

    pub fn into_policy(self) -> ActorCritic<InferenceBackend> {
        self.model.valid()
    }

    pub fn num_timesteps(&self) -> usize {
        self.num_timesteps
    }

    /// Runs collect/update iterations until at least `total_timesteps` env steps have been taken.
    /// Every rollout is collected in full, so the final count can overshoot.
    pub fn learn(&mut self, envs: &mut VecEnv, total_timesteps: usize) -> Vec<IterationStats> {
        let n_envs = envs.len();
        let mut buffer = RolloutBuffer::new(self.config.n_steps, n_envs);
        let mut optimizer = AdamConfig::new()
            .with_epsilon(ADAM_EPS)
            .with_grad_clipping(Some(GradientClippingConfig::Norm(
                self.config.max_grad_norm as f32,
            )))
            .init::<TrainingBackend, ActorCritic<TrainingBackend>>();
        let mut observations = envs.reset();
        let mut history = Vec::new();

        info!(
            total_timesteps,
            n_envs,
            n_steps = self.config.n_steps,
            batch_size = self.config.batch_size,
            "ppo training started"
        );

        let target = self.num_timesteps + total_timesteps;
        while self.num_timesteps < target {
            buffer.clear();
            let mut action_counts = EnumMap::<TradeAction, usize>::default();
            let policy = self.policy();

            while !buffer.is_full() {
                let outputs = policy.act(&observations, &mut self.rng);
                let actions: Vec<usize> = outputs.iter().map(|output| output.action).collect();
                let codes: Vec<i64> = actions.iter().map(|action| *action as i64).collect();

                for code in &codes {
                    if let Ok(action) = TradeAction::try_from(*code) {
                        action_counts[action] += 1;
                    }
                }

                let step = envs.step(&codes);

                for summary in step.finished.iter().flatten() {
                    self.record_episode(summary.reward);
                }

                let values: Vec<f64> = outputs.iter().map(|output| output.value).collect();
                let log_probs: Vec<f64> = outputs.iter().map(|output| output.log_prob).collect();
                buffer.push(
                    &observations,
                    &actions,
                    &step.rewards,
                    &step.dones,
                    &values,
                    &log_probs,
                );

                observations = step.obs;
                self.num_timesteps += n_envs;
            }

            let last_values = policy.estimate(&observations);
            buffer.compute_returns_and_advantages(
                &last_values,
                self.config.gamma,
                self.config.gae_lambda,
            );

            let update = self.update(&buffer, &mut optimizer);
            let stats = IterationStats {
                iteration: history.len() + 1,
                timesteps: self.num_timesteps,
                mean_episode_reward: self.mean_episode_reward(),
                episodes: self.episodes,
                policy_loss: update.policy_loss,
                value_loss: update.value_loss,
                entropy: update.entropy,
                approx_kl: update.approx_kl,
                clip_fraction: update.clip_fraction,
                explained_variance: explained_variance(buffer.values(), buffer.returns()),
                epochs: update.epochs,
                action_counts,
            };

            info!(
                iteration = stats.iteration,
                timesteps = stats.timesteps,
                mean_episode_reward = ?stats.mean_episode_reward,
                policy_loss = stats.policy_loss,
                value_loss = stats.value_loss,
                entropy = stats.entropy,
                approx_kl = stats.approx_kl,
                clip_fraction = stats.clip_fraction,
                "ppo iteration"
            );
            debug!(
                out = stats.action_counts[TradeAction::Out],
                buy = stats.action_counts[TradeAction::Buy],
                sell = stats.action_counts[TradeAction::Sell],
                explained_variance = stats.explained_variance,
                "rollout actions"
            );

            history.push(stats);
        }

        history
    }

    fn record_episode(&mut self, reward: f64) {
        if self.episode_rewards.len() == EPISODE_WINDOW {
            self.episode_rewards.pop_front();
        }
        self.episode_rewards.push_back(reward);
        self.episodes += 1;
    }

    pub fn mean_episode_reward(&self) -> Option<f64> {
        if self.episode_rewards.is_empty() {
            return None;
        }
        Some(self.episode_rewards.iter().sum::<f64>() / self.episode_rewards.len() as f64)
    }

    /// `n_epochs` passes of shuffled minibatches over the rollout.
    fn update<O>(&mut self, buffer: &RolloutBuffer, optimizer: &mut O) -> UpdateStats
    where
        O: Optimizer<ActorCritic<TrainingBackend>, TrainingBackend>,
    {
        let mut indices: Vec<usize> = (0..buffer.len()).collect();
        let mut totals = UpdateStats::default();
        let mut minibatches = 0;

        'epochs: for _ in 0..self.config.n_epochs {
            indices.shuffle(&mut self.rng);
            totals.epochs += 1;

            for chunk in indices.chunks(self.config.batch_size) {
                let batch = buffer.batch(chunk);
                let (terms, applied) = self.minibatch_step(&batch, optimizer);

                totals.policy_loss += terms.policy_loss;
                totals.value_loss += terms.value_loss;
                totals.entropy += terms.entropy;
                totals.approx_kl += terms.approx_kl;
                totals.clip_fraction += terms.clip_fraction;
                minibatches += 1;

                if !applied {
                    debug!(
                        epoch = totals.epochs,
                        approx_kl = terms.approx_kl,
                        "early stopping at target kl"
                    );
                    break 'epochs;
                }
            }
        }

        if minibatches > 0 {
            let count = minibatches as f64;
            totals.policy_loss /= count;
            totals.value_loss /= count;
            totals.entropy /= count;
            totals.approx_kl /= count;
            totals.clip_fraction /= count;
        }

        totals
    }

    /// Returns the loss terms and whether the gradient step was applied.
    fn minibatch_step<O>(&mut self, batch: &Minibatch, optimizer: &mut O) -> (LossTerms, bool)
    where
        O: Optimizer<ActorCritic<TrainingBackend>, TrainingBackend>,
    {
        let tensors = BatchTensors::new(batch, self.config.normalize_advantage, &self.device);
        let (loss, terms) = ppo_loss(&self.model, tensors, &self.config);

        if let Some(target_kl) = self.config.target_kl {
            if terms.approx_kl > 1.5 * target_kl {
                return (terms, false);
            }
        }

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = optimizer.step(self.config.learning_rate, self.model.clone(), grads);

        (terms, true)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        constants::env::ACTION_COUNT,
        env::{Observation, Position},
        ppo::policy::to_vec,
    };

    type TestBackend = InferenceBackend;

    fn small_config() -> PpoConfig {
        PpoConfig {
            n_steps: 16,
            batch_size: 8,
            n_epochs: 2,
            ..PpoConfig::default()
        }
    }

    fn single_batch(model: &ActorCritic<TestBackend>, advantages: Array1<f64>) -> Minibatch {
        let observations = vec![
            Observation::new(0.3, &Position::None),
            Observation::new(0.7, &Position::Long { entry_price: 0.5 }),
        ];
        let actions = vec![2, 0];
        let log_probs = to_vec(model.log_probs(features(&observations, &Default::default())));
        let old_log_probs = actions
            .iter()
            .enumerate()
            .map(|(row, action)| log_probs[row * ACTION_COUNT + action] as f64)
            .collect();
        let returns = Array1::from(model.estimate(&observations));

        Minibatch {
            observations,
            actions,
            old_log_probs,
            advantages,
            returns,
        }
    }

    #[test]
    fn unchanged_policy_has_zero_kl_and_no_clipping() {
        let device = Default::default();
        let model = ActorCritic::<TestBackend>::new(&device);
        let batch = single_batch(&model, array![1.0, -1.0]);

        let tensors = BatchTensors::new(&batch, false, &device);
        let (_, terms) = ppo_loss(&model, tensors, &PpoConfig::default());

        assert!(terms.approx_kl.abs() < 1e-6);
        assert_eq!(terms.clip_fraction, 0.0);
        // ratio 1 everywhere, so the surrogate is minus the mean advantage
        assert!(terms.policy_loss.abs() < 1e-6);
        assert!(terms.value_loss.abs() < 1e-6);
        assert!(terms.entropy > 0.0);
    }

    #[test]
    fn value_loss_is_the_mean_squared_error() {
        let device = Default::default();
        let model = ActorCritic::<TestBackend>::new(&device);
        let mut batch = single_batch(&model, array![0.0, 0.0]);
        batch.returns = &batch.returns + &array![1.0, -1.0];

        let tensors = BatchTensors::new(&batch, false, &device);
        let (loss, terms) = ppo_loss(&model, tensors, &PpoConfig::default());

        assert!((terms.value_loss - 1.0).abs() < 1e-5);
        // zero advantages and no entropy bonus leave only vf_coef * mse
        assert!((scalar(loss) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn stale_log_probs_are_clipped() {
        let device = Default::default();
        let model = ActorCritic::<TestBackend>::new(&device);
        let mut batch = single_batch(&model, array![1.0, 1.0]);
        batch.old_log_probs = batch.old_log_probs.mapv(|log_prob| log_prob - 1.0);

        let tensors = BatchTensors::new(&batch, false, &device);
        let (_, terms) = ppo_loss(&model, tensors, &PpoConfig::default());

        assert_eq!(terms.clip_fraction, 1.0);
        assert!(terms.approx_kl > 0.0);
        // A ratio of e clips to 1.2 under positive advantages
        assert!((terms.policy_loss + 1.2).abs() < 1e-5);
    }

    #[test]
    fn normalised_advantages_have_zero_mean_and_unit_std() {
        let normalised = normalize(&array![1.0, 2.0, 3.0, 6.0]);

        assert!(normalised.mean().unwrap_or(1.0).abs() < 1e-12);
        assert!((normalised.std(1.0) - 1.0).abs() < 1e-6);
        assert_eq!(normalize(&array![4.0]), array![4.0]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PpoConfig {
            n_epochs: 0,
            ..PpoConfig::default()
        };

        assert!(PpoTrainer::new(config, 0).is_err());
    }

    #[test]
    fn learn_runs_whole_rollouts_until_the_budget_is_spent() {
        let mut trainer = PpoTrainer::new(small_config(), 1).expect("trainer");
        let mut envs = VecEnv::new(2, None);

        let stats = trainer.learn(&mut envs, 70);

        assert_eq!(stats.len(), 3);
        assert_eq!(stats.last().map(|s| s.timesteps), Some(96));
        assert_eq!(trainer.num_timesteps(), 96);
        for (index, iteration) in stats.iter().enumerate() {
            assert_eq!(iteration.iteration, index + 1);
            assert_eq!(iteration.action_counts.values().sum::<usize>(), 32);
            assert!(iteration.policy_loss.is_finite());
            assert!(iteration.value_loss.is_finite());
            assert_eq!(iteration.epochs, 2);
        }
        // No episode is long enough to finish in 48 steps per env
        assert_eq!(stats[2].mean_episode_reward, None);
    }

    #[test]
    fn finished_episodes_feed_the_running_mean() {
        let config = PpoConfig {
            n_steps: 250,
            batch_size: 50,
            n_epochs: 1,
            ..PpoConfig::default()
        };
        let mut trainer = PpoTrainer::new(config, 2).expect("trainer");
        let mut envs = VecEnv::new(1, None);

        let stats = trainer.learn(&mut envs, 500);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].mean_episode_reward, None);
        assert_eq!(stats[1].episodes, 1);
        assert!(stats[1].mean_episode_reward.is_some());
    }

    #[test]
    fn positive_advantage_raises_the_chosen_action_probability() {
        let config = PpoConfig {
            learning_rate: 1e-3,
            n_steps: 8,
            batch_size: 8,
            n_epochs: 4,
            normalize_advantage: false,
            ..PpoConfig::default()
        };
        let mut trainer = PpoTrainer::new(config, 3).expect("trainer");
        let obs = Observation::new(0.4, &Position::None);
        let buy = 1;
        let buy_prob = |policy: &ActorCritic<TestBackend>| {
            to_vec(policy.probabilities(features(&[obs], &Default::default())))[buy]
        };

        let policy = trainer.policy();
        let before = buy_prob(&policy);
        let log_prob = to_vec(policy.log_probs(features(&[obs], &Default::default())))[buy] as f64;
        let value = policy.estimate(&[obs])[0];

        let mut buffer = RolloutBuffer::new(8, 1);
        for _ in 0..8 {
            buffer.push(&[obs], &[buy], &[1.0], &[false], &[value], &[log_prob]);
        }
        buffer.compute_returns_and_advantages(&[value], 0.99, 0.95);
        assert!(buffer.advantages().iter().all(|adv| *adv > 0.0));

        let mut optimizer = AdamConfig::new()
            .with_epsilon(ADAM_EPS)
            .init::<TrainingBackend, ActorCritic<TrainingBackend>>();
        trainer.update(&buffer, &mut optimizer);

        let after = buy_prob(&trainer.policy());
        assert!(after > before, "expected {after} > {before}");
    }
}
