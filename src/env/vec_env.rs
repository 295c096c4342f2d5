use crate::{
    error::RenderError,
    gym::{ActionSpace, Environment, ObservationSpace},
    render::Renderer,
};

use super::{env::StaticMarketEnv, observation::Observation};

/// Totals of an episode, captured just before its env is reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeSummary {
    pub reward: f64,
    pub profit: f64,
    pub length: usize,
}

/// Result of stepping every environment once.
#[derive(Debug, Clone)]
pub struct VecStep {
    /// Next observation per env. Slots whose episode ended hold the reset observation.
    pub obs: Vec<Observation>,
    pub rewards: Vec<f64>,
    pub dones: Vec<bool>,
    /// Final observation of each episode that ended on this step
    pub terminal_observations: Vec<Option<Observation>>,
    pub finished: Vec<Option<EpisodeSummary>>,
}

/// Independent copies of the market environment stepped in lockstep.
#[derive(Debug)]
pub struct VecEnv {
    pub envs: Vec<StaticMarketEnv>,
}

impl VecEnv {
    /// Only the first env is given the renderer.
    pub fn new(count: usize, renderer: Option<Box<dyn Renderer>>) -> Self {
        assert!(count > 0, "VecEnv needs at least one environment");

        let mut envs: Vec<StaticMarketEnv> = (0..count).map(|_| StaticMarketEnv::new()).collect();
        if let Some(renderer) = renderer {
            envs[0].set_renderer(renderer);
        }

        Self { envs }
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn reset(&mut self) -> Vec<Observation> {
        self.envs.iter_mut().map(|env| env.reset(None, None)).collect()
    }

    pub fn step(&mut self, actions: &[i64]) -> VecStep {
        assert_eq!(
            actions.len(),
            self.envs.len(),
            "VecEnv: actions.len={} != envs.len={}",
            actions.len(),
            self.envs.len()
        );

        let mut step = VecStep {
            obs: Vec::with_capacity(self.envs.len()),
            rewards: Vec::with_capacity(self.envs.len()),
            dones: Vec::with_capacity(self.envs.len()),
            terminal_observations: Vec::with_capacity(self.envs.len()),
            finished: Vec::with_capacity(self.envs.len()),
        };

        for (env, action) in self.envs.iter_mut().zip(actions) {
            let snapshot = env.step(*action);
            step.rewards.push(snapshot.reward);
            step.dones.push(snapshot.done);

            if snapshot.done {
                step.terminal_observations.push(Some(snapshot.state));
                step.finished.push(Some(EpisodeSummary {
                    reward: env.total_reward(),
                    profit: env.cumulative_profit(),
                    length: env.steps(),
                }));
                step.obs.push(env.reset(None, None));
            } else {
                step.terminal_observations.push(None);
                step.finished.push(None);
                step.obs.push(snapshot.state);
            }
        }

        step
    }

    pub fn render(&mut self) -> Result<(), RenderError> {
        self.primary_mut().render()
    }

    pub fn close(&mut self) {
        for env in &mut self.envs {
            env.close();
        }
    }

    pub fn primary(&self) -> &StaticMarketEnv {
        &self.envs[0]
    }

    pub fn primary_mut(&mut self) -> &mut StaticMarketEnv {
        &mut self.envs[0]
    }

    pub fn observation_space(&self) -> ObservationSpace {
        self.primary().observation_space()
    }

    pub fn action_space(&self) -> ActionSpace {
        self.primary().action_space()
    }
}
