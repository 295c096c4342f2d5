use tracing::debug;

use crate::{
    constants::{
        env::{ACTION_COUNT, HOLDING_PENALTY, IDLE_PENALTY, MAX_STEPS},
        market::{MAX_PRICE, MIN_PRICE, TRANSACTION_COST_RATE},
        render::WINDOW,
    },
    error::RenderError,
    gym::{ActionSpace, Environment, Info, ObservationSpace, Snapshot, TradeAction},
    render::Renderer,
};

use super::{
    history::{ActionEventKind, EpisodeHistory},
    market::{Direction, PriceProcess},
    observation::Observation,
    position::Position,
};

/// Single-asset market with a fixed oscillating price.
///
/// Every episode lasts `MAX_STEPS` steps. Opening a long and closing it again is the only
/// way to earn a positive reward; everything else is a small penalty or nothing at all.
#[derive(Debug)]
pub struct StaticMarketEnv {
    market: PriceProcess,
    position: Position,
    steps: usize,
    done: bool,
    cumulative_profit: f64,
    total_reward: f64,
    history: EpisodeHistory,
    renderer: Option<Box<dyn Renderer>>,
}

impl StaticMarketEnv {
    pub fn new() -> Self {
        Self {
            market: PriceProcess::new(),
            position: Position::None,
            steps: 0,
            done: false,
            cumulative_profit: 0.0,
            total_reward: 0.0,
            history: EpisodeHistory::new(),
            renderer: None,
        }
    }

    pub fn with_renderer(renderer: Box<dyn Renderer>) -> Self {
        let mut env = Self::new();
        env.renderer = Some(renderer);
        env
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = Some(renderer);
    }

    pub fn price(&self) -> f64 {
        self.market.price()
    }

    pub fn direction(&self) -> Direction {
        self.market.direction()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn entry_price(&self) -> Option<f64> {
        self.position.entry_price()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn cumulative_profit(&self) -> f64 {
        self.cumulative_profit
    }

    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    pub fn history(&self) -> &EpisodeHistory {
        &self.history
    }

    pub fn observation(&self) -> Observation {
        Observation::new(self.market.price(), &self.position)
    }

    fn open_long(&mut self, price: f64, transaction_cost: f64) -> f64 {
        self.position = Position::Long { entry_price: price };
        self.history
            .record_action(self.steps, price, ActionEventKind::Long);

        -transaction_cost
    }

    fn close_long(&mut self, entry_price: f64, price: f64, transaction_cost: f64) -> f64 {
        let reward = price - entry_price - transaction_cost;

        self.cumulative_profit += reward;
        self.position = Position::None;
        self.history
            .record_action(self.steps, price, ActionEventKind::Short);

        reward
    }
}

impl Default for StaticMarketEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for StaticMarketEnv {
    type ActionType = i64;
    type StateType = Observation;

    /// The price process is deterministic, so `seed` and `options` have nothing to change.
    fn reset(&mut self, _seed: Option<u64>, _options: Option<&Info>) -> Observation {
        self.market.reset();
        self.position = Position::None;
        self.steps = 0;
        self.done = false;
        self.cumulative_profit = 0.0;
        self.total_reward = 0.0;
        self.history.clear();

        self.observation()
    }

    fn step(&mut self, action: i64) -> Snapshot<Observation> {
        let price = self.market.advance();
        let transaction_cost = TRANSACTION_COST_RATE * price;

        let reward = match (TradeAction::try_from(action), self.position) {
            (Ok(TradeAction::Out), Position::None) => IDLE_PENALTY,
            (Ok(TradeAction::Out), _) => HOLDING_PENALTY,
            (Ok(TradeAction::Buy), Position::None) => self.open_long(price, transaction_cost),
            (Ok(TradeAction::Sell), Position::Long { entry_price }) => {
                self.close_long(entry_price, price, transaction_cost)
            }
            // Buy while long, sell while flat, or an unknown action code
            _ => 0.0,
        };

        self.history.record_price(self.steps, price);

        self.steps += 1;
        if self.steps >= MAX_STEPS && !self.done {
            self.done = true;
            debug!(
                steps = self.steps,
                cumulative_profit = self.cumulative_profit,
                total_reward = self.total_reward + reward,
                "episode finished"
            );
        }

        self.total_reward += reward;

        Snapshot::new(self.observation(), reward, self.done)
    }

    fn render(&mut self) -> Result<(), RenderError> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };

        let frame = self
            .history
            .frame(WINDOW, self.cumulative_profit, self.total_reward);
        renderer.draw(&frame)
    }

    fn close(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.close();
        }
    }

    /// The position code spans `-1..=1`, so the second dimension is widened to match.
    fn observation_space(&self) -> ObservationSpace {
        ObservationSpace::new(
            vec![MIN_PRICE as f32, Position::Short.code()],
            vec![MAX_PRICE as f32, Position::Long { entry_price: 0.0 }.code()],
        )
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete(ACTION_COUNT)
    }
}
