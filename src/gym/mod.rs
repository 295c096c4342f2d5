pub mod action_discrete;
pub mod base;
pub mod space;

pub use action_discrete::TradeAction;
pub use base::{Action, Environment, Info, Snapshot, State};
pub use space::{ActionSpace, ObservationSpace};
