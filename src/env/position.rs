/// Order position held by the agent.
///
/// The entry price lives inside `Long`, so it exists exactly while a position is open.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    /// Never entered by any action, kept for its observation code
    Short,
    #[default]
    None,
    Long { entry_price: f64 },
}

impl Position {
    /// Numeric code used in observations: -1 short, 0 none, 1 long
    pub fn code(&self) -> f32 {
        match self {
            Position::Short => -1.0,
            Position::None => 0.0,
            Position::Long { .. } => 1.0,
        }
    }

    pub fn entry_price(&self) -> Option<f64> {
        match self {
            Position::Long { entry_price } => Some(*entry_price),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Position::None)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long { .. })
    }
}
