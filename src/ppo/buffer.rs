use ndarray::Array1;

use crate::env::{Observation, ObservationData};

/// One shuffled slice of the rollout, ready for a gradient step.
#[derive(Debug, Clone)]
pub struct Minibatch {
    pub observations: Vec<Observation>,
    pub actions: Vec<usize>,
    pub old_log_probs: Array1<f64>,
    pub advantages: Array1<f64>,
    pub returns: Array1<f64>,
}

impl Minibatch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Transitions from `n_steps` lockstep steps of `n_envs` environments.
///
/// Storage is step-major: transition `(t, e)` lives at `t * n_envs + e`.
#[derive(Debug, Clone)]
pub struct RolloutBuffer {
    n_steps: usize,
    n_envs: usize,
    observations: Vec<ObservationData>,
    actions: Vec<usize>,
    rewards: Vec<f64>,
    dones: Vec<bool>,
    values: Vec<f64>,
    log_probs: Vec<f64>,
    advantages: Vec<f64>,
    returns: Vec<f64>,
}

impl RolloutBuffer {
    pub fn new(n_steps: usize, n_envs: usize) -> Self {
        let capacity = n_steps * n_envs;

        Self {
            n_steps,
            n_envs,
            observations: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            dones: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            log_probs: Vec::with_capacity(capacity),
            advantages: Vec::new(),
            returns: Vec::new(),
        }
    }

    /// Number of stored transitions across all envs
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.n_steps * self.n_envs
    }

    /// Records one lockstep step. `dones[e]` marks that env `e` finished its episode on this step.
    pub fn push(
        &mut self,
        observations: &[Observation],
        actions: &[usize],
        rewards: &[f64],
        dones: &[bool],
        values: &[f64],
        log_probs: &[f64],
    ) {
        let n = self.n_envs;
        let lens = [
            observations.len(),
            actions.len(),
            rewards.len(),
            dones.len(),
            values.len(),
            log_probs.len(),
        ];
        assert!(
            lens.iter().all(|len| *len == n),
            "RolloutBuffer: every slice must hold one entry per env ({n})"
        );
        assert!(!self.is_full(), "RolloutBuffer is full");

        self.observations.extend(observations.iter().map(Observation::as_array));
        self.actions.extend_from_slice(actions);
        self.rewards.extend_from_slice(rewards);
        self.dones.extend_from_slice(dones);
        self.values.extend_from_slice(values);
        self.log_probs.extend_from_slice(log_probs);
    }

    /// GAE(gamma, lambda) per env, bootstrapping from `last_values` after the final step.
    /// Returns are `advantage + value`.
    pub fn compute_returns_and_advantages(
        &mut self,
        last_values: &[f64],
        gamma: f64,
        gae_lambda: f64,
    ) {
        assert_eq!(last_values.len(), self.n_envs);

        let n = self.n_envs;
        let steps = self.len() / n;
        self.advantages = vec![0.0; self.len()];
        self.returns = vec![0.0; self.len()];

        for env in 0..n {
            let mut gae = 0.0;

            for t in (0..steps).rev() {
                let index = t * n + env;
                let next_value = if t + 1 == steps {
                    last_values[env]
                } else {
                    self.values[index + n]
                };
                let next_non_terminal = if self.dones[index] { 0.0 } else { 1.0 };

                let delta = self.rewards[index] + gamma * next_value * next_non_terminal
                    - self.values[index];
                gae = delta + gamma * gae_lambda * next_non_terminal * gae;

                self.advantages[index] = gae;
                self.returns[index] = gae + self.values[index];
            }
        }
    }

    pub fn advantages(&self) -> &[f64] {
        &self.advantages
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Gathers the transitions at `indices`. Call after `compute_returns_and_advantages`.
    pub fn batch(&self, indices: &[usize]) -> Minibatch {
        debug_assert_eq!(self.advantages.len(), self.len());

        Minibatch {
            observations: indices.iter().map(|index| self.observations[*index].into()).collect(),
            actions: indices.iter().map(|index| self.actions[*index]).collect(),
            old_log_probs: indices.iter().map(|index| self.log_probs[*index]).collect(),
            advantages: indices.iter().map(|index| self.advantages[*index]).collect(),
            returns: indices.iter().map(|index| self.returns[*index]).collect(),
        }
    }

    pub fn clear(&mut self) {
        self.observations.clear();
        self.actions.clear();
        self.rewards.clear();
        self.dones.clear();
        self.values.clear();
        self.log_probs.clear();
        self.advantages.clear();
        self.returns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Position;

    fn flat() -> Observation {
        Observation::new(0.0, &Position::None)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-12, "expected {expected}, got {actual}");
    }

    #[test]
    fn gae_matches_a_hand_computation() {
        let mut buffer = RolloutBuffer::new(3, 1);
        buffer.push(&[flat()], &[0], &[1.0], &[false], &[0.5], &[0.0]);
        buffer.push(&[flat()], &[1], &[0.0], &[true], &[1.0], &[0.0]);
        buffer.push(&[flat()], &[2], &[2.0], &[false], &[0.0], &[0.0]);
        assert!(buffer.is_full());

        buffer.compute_returns_and_advantages(&[2.0], 0.5, 0.5);

        // t=2: 2 + 0.5*2 - 0 = 3
        // t=1: episode ended, 0 - 1 = -1
        // t=0: (1 + 0.5*1 - 0.5) + 0.25*(-1) = 0.75
        let expected = [0.75, -1.0, 3.0];
        for (actual, expected) in buffer.advantages().iter().zip(expected) {
            assert_close(*actual, expected);
        }
        for (index, expected) in [1.25, 0.0, 3.0].into_iter().enumerate() {
            assert_close(buffer.returns()[index], expected);
        }
    }

    #[test]
    fn envs_are_bootstrapped_independently() {
        let mut buffer = RolloutBuffer::new(2, 2);
        for _ in 0..2 {
            buffer.push(
                &[flat(), flat()],
                &[0, 0],
                &[1.0, 0.0],
                &[false, false],
                &[0.0, 0.0],
                &[0.0, 0.0],
            );
        }

        buffer.compute_returns_and_advantages(&[0.0, 10.0], 1.0, 1.0);

        // env 0 sums its rewards, env 1 only sees its bootstrap value
        assert_close(buffer.advantages()[0], 2.0);
        assert_close(buffer.advantages()[2], 1.0);
        assert_close(buffer.advantages()[1], 10.0);
        assert_close(buffer.advantages()[3], 10.0);
    }

    #[test]
    fn batch_gathers_the_requested_rows() {
        let mut buffer = RolloutBuffer::new(2, 1);
        let long = Observation::new(0.3, &Position::Long { entry_price: 0.3 });
        buffer.push(&[flat()], &[0], &[0.0], &[false], &[0.0], &[-1.0]);
        buffer.push(&[long], &[2], &[0.0], &[false], &[0.0], &[-2.0]);
        buffer.compute_returns_and_advantages(&[0.0], 0.99, 0.95);

        let batch = buffer.batch(&[1, 0]);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.actions, vec![2, 0]);
        assert_eq!(batch.observations, vec![long, flat()]);
        assert_eq!(batch.old_log_probs[0], -2.0);

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
