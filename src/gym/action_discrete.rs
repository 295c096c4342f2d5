use crate::gym::base::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, enum_map::Enum)]
pub enum TradeAction {
    /// Stay out, or keep holding
    Out,
    /// Open a long position
    Buy,
    /// Close the long position
    Sell,
}

impl TradeAction {
    pub fn label(&self) -> &'static str {
        match self {
            TradeAction::Out => "Out",
            TradeAction::Buy => "Buy",
            TradeAction::Sell => "Sell",
        }
    }
}

impl Action for TradeAction {
    fn enumerate() -> Vec<Self> {
        vec![TradeAction::Out, TradeAction::Buy, TradeAction::Sell]
    }
}

/// Codes outside `0..=2` are not actions; the environment treats them as no-ops.
impl TryFrom<i64> for TradeAction {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TradeAction::Out),
            1 => Ok(TradeAction::Buy),
            2 => Ok(TradeAction::Sell),
            other => Err(other),
        }
    }
}

impl From<TradeAction> for i64 {
    fn from(action: TradeAction) -> Self {
        match action {
            TradeAction::Out => 0,
            TradeAction::Buy => 1,
            TradeAction::Sell => 2,
        }
    }
}
