use std::fmt::Debug;

use burn::tensor::{backend::Backend, Tensor};

/// Observation data to feed into the neural network.
pub trait State: Debug + Copy + Clone {
    fn size() -> usize;

    fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 1>;
}
