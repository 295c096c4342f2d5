pub mod market {
    /// Price change applied on every step, in the current direction
    pub const PRICE_INCREMENT: f64 = 0.1;
    pub const MIN_PRICE: f64 = 0.0;
    pub const MAX_PRICE: f64 = 1.0;
    /// Fraction of the current price charged when opening or closing a position
    pub const TRANSACTION_COST_RATE: f64 = 0.001;
}

pub mod env {
    /// Episodes are done once this many steps have been taken
    pub const MAX_STEPS: usize = 500;
    /// Reward for staying out of the market while flat
    pub const IDLE_PENALTY: f64 = -0.002;
    /// Reward for choosing `Out` while holding a position
    pub const HOLDING_PENALTY: f64 = -0.005;
    /// How many recent prices are kept in the sliding window
    pub const PRICE_WINDOW: usize = 10;
    pub const OBSERVATION_SIZE: usize = 2;
    pub const ACTION_COUNT: usize = 3;
}

pub mod render {
    /// Number of trailing points drawn per series
    pub const WINDOW: usize = 50;
    pub const CHART_DIMS: (u32, u32) = (1280, 720);
    pub const CHART_FILE: &str = "market.png";
}

pub mod files {
    pub const RENDER_PATH: &str = "render";
}

pub mod ppo {
    pub const HIDDEN_SIZES: [usize; 2] = [64, 64];
    pub const HIDDEN_GAIN: f64 = 1.0;
    pub const POLICY_OUTPUT_GAIN: f64 = 0.01;
    pub const VALUE_OUTPUT_GAIN: f64 = 1.0;
    pub const ADAM_EPS: f32 = 1e-5;
    pub const ADVANTAGE_EPS: f64 = 1e-8;
}

pub mod driver {
    pub const TRAIN_TIMESTEPS: usize = 10_000;
    pub const INFER_STEPS: usize = 1_000;
    pub const ENV_COUNT: usize = 1;
    pub const SEED: u64 = 0;
    pub const ENV_PREFIX: &str = "MARKET_RL";
}
