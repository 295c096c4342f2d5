use std::collections::VecDeque;

use crate::{constants::env::PRICE_WINDOW, render::RenderFrame, types::TimedData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionEventKind {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionEvent {
    pub step: usize,
    pub price: f64,
    pub kind: ActionEventKind,
}

/// Display-only record of an episode. Nothing here feeds rewards or observations.
#[derive(Debug, Clone, Default)]
pub struct EpisodeHistory {
    prices: TimedData,
    actions: Vec<ActionEvent>,
    recent_prices: VecDeque<f64>,
}

impl EpisodeHistory {
    pub fn new() -> Self {
        Self {
            prices: Vec::new(),
            actions: Vec::new(),
            recent_prices: VecDeque::with_capacity(PRICE_WINDOW),
        }
    }

    pub fn record_price(&mut self, step: usize, price: f64) {
        self.prices.push((step, price));

        if self.recent_prices.len() >= PRICE_WINDOW {
            self.recent_prices.pop_front();
        }
        self.recent_prices.push_back(price);
    }

    pub fn record_action(&mut self, step: usize, price: f64, kind: ActionEventKind) {
        self.actions.push(ActionEvent { step, price, kind });
    }

    pub fn prices(&self) -> &TimedData {
        &self.prices
    }

    pub fn actions(&self) -> &[ActionEvent] {
        &self.actions
    }

    /// The last `PRICE_WINDOW` prices, oldest first
    pub fn recent_prices(&self) -> &VecDeque<f64> {
        &self.recent_prices
    }

    pub fn clear(&mut self) {
        self.prices.clear();
        self.actions.clear();
        self.recent_prices.clear();
    }

    pub fn frame(&self, window: usize, cumulative_profit: f64, total_reward: f64) -> RenderFrame {
        RenderFrame {
            prices: tail(&self.prices, window),
            longs: tail(&self.events_of(ActionEventKind::Long), window),
            shorts: tail(&self.events_of(ActionEventKind::Short), window),
            cumulative_profit,
            total_reward,
        }
    }

    fn events_of(&self, kind: ActionEventKind) -> TimedData {
        self.actions
            .iter()
            .filter(|event| event.kind == kind)
            .map(|event| (event.step, event.price))
            .collect()
    }
}

fn tail<T: Clone>(items: &[T], window: usize) -> Vec<T> {
    items[items.len().saturating_sub(window)..].to_vec()
}
