mod buffer;
mod config;
mod model;
mod policy;
mod trainer;

pub use buffer::{Minibatch, RolloutBuffer};
pub use config::PpoConfig;
pub use model::{ActorCritic, InferenceBackend, Mlp, TrainingBackend};
pub use policy::{features, to_vec, Policy, PolicyOutput, RandomPolicy};
pub use trainer::{IterationStats, PpoTrainer};
