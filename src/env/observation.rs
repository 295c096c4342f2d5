use burn::tensor::{backend::Backend, Tensor};

use crate::{constants::env::OBSERVATION_SIZE, gym::State};

use super::position::Position;

pub type ObservationData = [f32; OBSERVATION_SIZE];

/// `[current_price, position_code]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    data: ObservationData,
}

impl Observation {
    pub fn new(price: f64, position: &Position) -> Self {
        Self {
            data: [price as f32, position.code()],
        }
    }

    pub fn price(&self) -> f32 {
        self.data[0]
    }

    pub fn position_code(&self) -> f32 {
        self.data[1]
    }

    pub fn as_array(&self) -> ObservationData {
        self.data
    }
}

impl From<ObservationData> for Observation {
    fn from(data: ObservationData) -> Self {
        Self { data }
    }
}

impl State for Observation {
    fn size() -> usize {
        OBSERVATION_SIZE
    }

    fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 1> {
        Tensor::<B, 1>::from_floats(self.data, device)
    }
}
