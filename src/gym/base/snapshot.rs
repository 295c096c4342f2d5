use std::collections::BTreeMap;

/// Free-form diagnostics attached to a step. The market environment always leaves it empty.
pub type Info = BTreeMap<String, f64>;

/// The return value for a step.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<S> {
    pub state: S,
    pub reward: f64,
    pub done: bool,
    pub truncated: bool,
    pub info: Info,
}

impl<S> Snapshot<S> {
    pub fn new(state: S, reward: f64, done: bool) -> Self {
        Self {
            state,
            reward,
            done,
            truncated: false,
            info: Info::new(),
        }
    }
}
