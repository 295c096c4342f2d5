/// A list of values, where the last index is the most recent
pub type Data = Vec<f64>;

/// A list of tuples of (step, price), where the last index is the most recent
pub type TimedData = Vec<(usize, f64)>;
