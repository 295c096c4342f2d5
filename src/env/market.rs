use crate::constants::market::{MAX_PRICE, MIN_PRICE, PRICE_INCREMENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn flipped(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Deterministic oscillating price.
///
/// The price is stored as a whole number of increments above `MIN_PRICE`, so both
/// boundaries are reached exactly and the direction flips on the step that touches them.
#[derive(Debug, Clone)]
pub struct PriceProcess {
    level: u32,
    levels: u32,
    direction: Direction,
}

impl PriceProcess {
    pub fn new() -> Self {
        let levels = ((MAX_PRICE - MIN_PRICE) / PRICE_INCREMENT).round() as u32;

        Self {
            level: 0,
            levels,
            direction: Direction::Up,
        }
    }

    /// Moves one increment in the current direction, clamps to the price range and
    /// flips the direction if a boundary was hit. Returns the new price.
    pub fn advance(&mut self) -> f64 {
        self.level = match self.direction {
            Direction::Up => (self.level + 1).min(self.levels),
            Direction::Down => self.level.saturating_sub(1),
        };

        if self.level == 0 || self.level == self.levels {
            self.direction = self.direction.flipped();
        }

        self.price()
    }

    pub fn price(&self) -> f64 {
        MIN_PRICE + (MAX_PRICE - MIN_PRICE) * self.level as f64 / self.levels as f64
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn reset(&mut self) {
        self.level = 0;
        self.direction = Direction::Up;
    }
}

impl Default for PriceProcess {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rises_to_the_top_then_turns_down() {
        let mut market = PriceProcess::new();
        assert_eq!(market.price(), 0.0);
        assert_eq!(market.direction(), Direction::Up);

        for step in 1..=9 {
            let price = market.advance();
            assert!((price - step as f64 * 0.1).abs() < 1e-12);
            assert_eq!(market.direction(), Direction::Up);
        }

        assert_eq!(market.advance(), 1.0);
        assert_eq!(market.direction(), Direction::Down);
        assert!((market.advance() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn full_cycle_returns_to_zero_and_turns_up() {
        let mut market = PriceProcess::new();

        for _ in 0..20 {
            market.advance();
        }

        assert_eq!(market.price(), 0.0);
        assert_eq!(market.direction(), Direction::Up);
        assert!((market.advance() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn reset_restores_the_starting_state() {
        let mut market = PriceProcess::new();
        for _ in 0..13 {
            market.advance();
        }

        market.reset();

        assert_eq!(market.price(), 0.0);
        assert_eq!(market.direction(), Direction::Up);
    }
}
