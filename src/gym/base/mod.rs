mod action;
pub mod environment;
mod snapshot;
mod state;

pub use action::Action;
pub use environment::Environment;
pub use snapshot::{Info, Snapshot};
pub use state::State;
