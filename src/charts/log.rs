use tracing::info;

use crate::{
    error::RenderError,
    render::{RenderFrame, Renderer},
};

/// Reports each frame through `tracing` instead of drawing it.
#[derive(Debug, Default)]
pub struct LogRenderer {
    closed: bool,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for LogRenderer {
    fn draw(&mut self, frame: &RenderFrame) -> Result<(), RenderError> {
        if self.closed {
            return Err(RenderError::Closed);
        }

        let (step, price) = frame.prices.last().copied().unwrap_or_default();
        info!(
            step,
            price,
            longs = frame.longs.len(),
            shorts = frame.shorts.len(),
            profit = frame.cumulative_profit,
            reward = frame.total_reward,
            "market"
        );

        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Accepts every frame and draws nothing.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn draw(&mut self, _frame: &RenderFrame) -> Result<(), RenderError> {
        Ok(())
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_renderer_stops_after_close() {
        let mut renderer = LogRenderer::new();
        assert!(renderer.draw(&RenderFrame::default()).is_ok());

        renderer.close();

        assert!(matches!(renderer.draw(&RenderFrame::default()), Err(RenderError::Closed)));
    }
}
