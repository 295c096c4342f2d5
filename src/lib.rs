pub mod charts;
pub mod config;
pub mod constants;
pub mod driver;
pub mod env;
pub mod error;
pub mod gym;
pub mod logging;
pub mod ppo;
pub mod render;
pub mod types;

pub use env::{StaticMarketEnv, VecEnv};
pub use error::{Error, Result};
