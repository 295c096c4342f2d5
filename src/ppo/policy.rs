use burn::tensor::{backend::Backend, Tensor};
use ordered_float::OrderedFloat;
use rand::Rng;

use crate::{
    constants::env::ACTION_COUNT,
    env::Observation,
    gym::{Action, State, TradeAction},
};

use super::model::ActorCritic;

/// Picks an action code for an observation.
pub trait Policy {
    fn predict<R: Rng + ?Sized>(
        &self,
        obs: &Observation,
        deterministic: bool,
        rng: &mut R,
    ) -> i64;
}

/// What the actor-critic decided for one observation while collecting a rollout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyOutput {
    pub action: usize,
    pub log_prob: f64,
    pub value: f64,
}

/// Stacks observations into a `[batch, OBSERVATION_SIZE]` tensor.
pub fn features<B: Backend>(observations: &[Observation], device: &B::Device) -> Tensor<B, 2> {
    let rows = observations.iter().map(|obs| obs.to_tensor::<B>(device)).collect();
    Tensor::stack(rows, 0)
}

pub fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().iter::<f32>().collect()
}

fn argmax(probs: &[f32]) -> usize {
    probs
        .iter()
        .enumerate()
        .max_by_key(|(_, prob)| OrderedFloat(**prob))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

/// Inverse-CDF draw from a categorical distribution.
fn sample<R: Rng + ?Sized>(probs: &[f32], rng: &mut R) -> usize {
    let target: f32 = rng.gen();
    let mut cumulative = 0.0;

    for (index, prob) in probs.iter().enumerate() {
        cumulative += prob;
        if target < cumulative {
            return index;
        }
    }
    probs.len().saturating_sub(1)
}

impl<B: Backend> ActorCritic<B> {
    /// Samples one action per observation and records its log-probability and value estimate.
    pub fn act<R: Rng + ?Sized>(
        &self,
        observations: &[Observation],
        rng: &mut R,
    ) -> Vec<PolicyOutput> {
        let x = features::<B>(observations, &Default::default());
        let log_probs = to_vec(self.log_probs(x.clone()));
        let values = to_vec(self.values(x));

        log_probs
            .chunks(ACTION_COUNT)
            .zip(values)
            .map(|(row, value)| {
                let probs: Vec<f32> = row.iter().map(|log_prob| log_prob.exp()).collect();
                let action = sample(&probs, &mut *rng);
                PolicyOutput {
                    action,
                    log_prob: row[action] as f64,
                    value: value as f64,
                }
            })
            .collect()
    }

    /// Critic estimates for a batch of observations.
    pub fn estimate(&self, observations: &[Observation]) -> Vec<f64> {
        let x = features::<B>(observations, &Default::default());
        to_vec(self.values(x)).into_iter().map(f64::from).collect()
    }
}

impl<B: Backend> Policy for ActorCritic<B> {
    fn predict<R: Rng + ?Sized>(
        &self,
        obs: &Observation,
        deterministic: bool,
        rng: &mut R,
    ) -> i64 {
        let x = features::<B>(std::slice::from_ref(obs), &Default::default());
        let probs = to_vec(self.probabilities(x));

        let action = if deterministic { argmax(&probs) } else { sample(&probs, rng) };
        action as i64
    }
}

/// Uniform baseline that ignores the observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPolicy;

impl Policy for RandomPolicy {
    fn predict<R: Rng + ?Sized>(
        &self,
        _obs: &Observation,
        _deterministic: bool,
        rng: &mut R,
    ) -> i64 {
        TradeAction::random(rng).into()
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{env::Position, ppo::model::InferenceBackend};

    type TestBackend = InferenceBackend;

    #[test]
    fn fresh_policy_is_close_to_uniform() {
        let model = ActorCritic::<TestBackend>::new(&Default::default());
        let obs = Observation::new(0.5, &Position::Long { entry_price: 0.4 });

        let probs = to_vec(model.probabilities(features(&[obs], &Default::default())));

        assert_eq!(probs.len(), ACTION_COUNT);
        assert!(probs.iter().all(|prob| (prob - 1.0 / 3.0).abs() < 0.05));
    }

    #[test]
    fn features_keep_observation_order() {
        let observations = [
            Observation::new(0.1, &Position::None),
            Observation::new(0.9, &Position::Long { entry_price: 0.5 }),
        ];

        let x = features::<TestBackend>(&observations, &Default::default());

        assert_eq!(x.dims(), [2, 2]);
        assert_eq!(to_vec(x), vec![0.1, 0.0, 0.9, 1.0]);
    }

    #[test]
    fn act_reports_the_log_prob_of_the_sampled_action() {
        let mut rng = StdRng::seed_from_u64(4);
        let model = ActorCritic::<TestBackend>::new(&Default::default());
        let observations = [
            Observation::new(0.1, &Position::None),
            Observation::new(0.9, &Position::Long { entry_price: 0.5 }),
        ];

        let outputs = model.act(&observations, &mut rng);
        let log_probs = to_vec(model.log_probs(features(&observations, &Default::default())));
        let values = model.estimate(&observations);

        assert_eq!(outputs.len(), 2);
        for (index, output) in outputs.iter().enumerate() {
            assert!(output.action < ACTION_COUNT);
            let expected = log_probs[index * ACTION_COUNT + output.action] as f64;
            assert!((output.log_prob - expected).abs() < 1e-6);
            assert!((output.value - values[index]).abs() < 1e-6);
        }
    }

    #[test]
    fn deterministic_prediction_is_the_argmax() {
        assert_eq!(argmax(&[0.2, 0.5, 0.3]), 1);

        let mut rng = StdRng::seed_from_u64(9);
        let model = ActorCritic::<TestBackend>::new(&Default::default());
        let obs = Observation::new(0.2, &Position::None);
        let first = model.predict(&obs, true, &mut rng);

        for _ in 0..10 {
            assert_eq!(model.predict(&obs, true, &mut rng), first);
        }
    }

    #[test]
    fn sampling_follows_the_cumulative_distribution() {
        let mut rng = StdRng::seed_from_u64(2);

        for _ in 0..20 {
            assert_eq!(sample(&[0.0, 1.0, 0.0], &mut rng), 1);
        }
        assert_eq!(sample(&[0.0, 0.0, 0.0], &mut rng), 2);
    }

    #[test]
    fn random_policy_only_emits_valid_codes() {
        let mut rng = StdRng::seed_from_u64(1);
        let obs = Observation::new(0.0, &Position::None);

        for _ in 0..50 {
            let code = RandomPolicy.predict(&obs, true, &mut rng);
            assert!((0..3).contains(&code));
        }
    }
}
