mod env;
mod history;
mod market;
mod observation;
mod position;
mod vec_env;

pub use env::StaticMarketEnv;
pub use history::{ActionEvent, ActionEventKind, EpisodeHistory};
pub use market::{Direction, PriceProcess};
pub use observation::{Observation, ObservationData};
pub use position::Position;
pub use vec_env::{EpisodeSummary, VecEnv, VecStep};
