use crate::error::RenderError;

use super::{Info, Snapshot, State};
use crate::gym::space::{ActionSpace, ObservationSpace};

pub trait Environment {
    /// Raw action code accepted by `step`
    type ActionType: Copy;
    type StateType: State;

    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Self::StateType;

    fn step(&mut self, action: Self::ActionType) -> Snapshot<Self::StateType>;

    fn render(&mut self) -> Result<(), RenderError>;

    fn close(&mut self);

    fn observation_space(&self) -> ObservationSpace;

    fn action_space(&self) -> ActionSpace;
}
