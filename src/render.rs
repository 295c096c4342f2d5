//! Display surface seen by the simulation. Implementations live in `charts`.

use std::fmt::Debug;

use crate::{error::RenderError, types::TimedData};

/// Snapshot of everything a renderer may show for one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    /// Trailing `(step, price)` points
    pub prices: TimedData,
    /// Trailing long entries as `(step, price)`
    pub longs: TimedData,
    /// Trailing position closes as `(step, price)`
    pub shorts: TimedData,
    pub cumulative_profit: f64,
    pub total_reward: f64,
}

pub trait Renderer: Debug {
    fn draw(&mut self, frame: &RenderFrame) -> Result<(), RenderError>;

    /// Releases the display surface. Later draws fail with `RenderError::Closed`.
    fn close(&mut self);
}
