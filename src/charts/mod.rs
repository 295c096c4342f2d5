mod log;
pub mod market;
pub mod progress;
mod theme;

pub use log::{LogRenderer, NullRenderer};
pub use market::{market_chart, ChartRenderer};
pub use progress::progress_chart;
