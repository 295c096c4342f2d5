/// Continuous box of observations, one `[low, high]` interval per dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl ObservationSpace {
    pub fn new(low: Vec<f32>, high: Vec<f32>) -> Self {
        assert_eq!(low.len(), high.len(), "box bounds must have the same shape");
        Self { low, high }
    }

    pub fn shape(&self) -> usize {
        self.low.len()
    }

    pub fn contains(&self, values: &[f32]) -> bool {
        values.len() == self.shape()
            && values
                .iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(value, (low, high))| value >= low && value <= high)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSpace {
    Discrete(usize),
}

impl ActionSpace {
    pub fn n(&self) -> usize {
        match self {
            ActionSpace::Discrete(n) => *n,
        }
    }

    pub fn contains(&self, action: i64) -> bool {
        action >= 0 && (action as usize) < self.n()
    }
}
