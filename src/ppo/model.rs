use burn::{
    backend::{Autodiff, NdArray},
    module::Module,
    nn::{Initializer, Linear, LinearConfig},
    tensor::{
        activation::{log_softmax, softmax, tanh},
        backend::Backend,
        Tensor,
    },
};

use crate::constants::{
    env::{ACTION_COUNT, OBSERVATION_SIZE},
    ppo::{HIDDEN_GAIN, HIDDEN_SIZES, POLICY_OUTPUT_GAIN, VALUE_OUTPUT_GAIN},
};

/// Backend rollouts and inference run on.
pub type InferenceBackend = NdArray;
/// Backend the PPO update differentiates through.
pub type TrainingBackend = Autodiff<NdArray>;

/// Fully connected network with tanh between the layers and a linear output.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    layers: Vec<Linear<B>>,
}

impl<B: Backend> Mlp<B> {
    /// `sizes` runs from the input width to the output width.
    pub fn new(sizes: &[usize], output_gain: f64, device: &B::Device) -> Self {
        let last = sizes.len().saturating_sub(2);
        let layers = sizes
            .windows(2)
            .enumerate()
            .map(|(index, pair)| {
                let gain = if index == last { output_gain } else { HIDDEN_GAIN };
                LinearConfig::new(pair[0], pair[1])
                    .with_initializer(Initializer::XavierUniform { gain })
                    .init(device)
            })
            .collect();

        Self { layers }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len().saturating_sub(1);

        self.layers.iter().enumerate().fold(x, |x, (index, layer)| {
            let x = layer.forward(x);
            if index == last {
                x
            } else {
                tanh(x)
            }
        })
    }

    pub fn layers(&self) -> &[Linear<B>] {
        &self.layers
    }

    pub fn output_size(&self) -> usize {
        self.layers
            .last()
            .map(|layer| layer.weight.val().dims()[1])
            .unwrap_or(0)
    }
}

fn sizes(outputs: usize) -> Vec<usize> {
    let mut sizes = vec![OBSERVATION_SIZE];
    sizes.extend(HIDDEN_SIZES);
    sizes.push(outputs);
    sizes
}

/// Separate actor and critic networks over the market observation.
#[derive(Module, Debug)]
pub struct ActorCritic<B: Backend> {
    actor: Mlp<B>,
    critic: Mlp<B>,
}

impl<B: Backend> ActorCritic<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            actor: Mlp::new(&sizes(ACTION_COUNT), POLICY_OUTPUT_GAIN, device),
            critic: Mlp::new(&sizes(1), VALUE_OUTPUT_GAIN, device),
        }
    }

    pub fn actor(&self) -> &Mlp<B> {
        &self.actor
    }

    pub fn critic(&self) -> &Mlp<B> {
        &self.critic
    }

    /// `[batch, ACTION_COUNT]`
    pub fn logits(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.actor.forward(x)
    }

    pub fn log_probs(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        log_softmax(self.logits(x), 1)
    }

    pub fn probabilities(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.logits(x), 1)
    }

    /// `[batch]`
    pub fn values(&self, x: Tensor<B, 2>) -> Tensor<B, 1> {
        self.critic.forward(x).squeeze(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = InferenceBackend;

    #[test]
    fn networks_have_the_expected_shapes() {
        let device = Default::default();
        let model = ActorCritic::<TestBackend>::new(&device);

        assert_eq!(model.actor().layers().len(), HIDDEN_SIZES.len() + 1);
        assert_eq!(model.actor().output_size(), ACTION_COUNT);
        assert_eq!(model.critic().output_size(), 1);

        let x = Tensor::<TestBackend, 2>::zeros([5, OBSERVATION_SIZE], &device);
        assert_eq!(model.logits(x.clone()).dims(), [5, ACTION_COUNT]);
        assert_eq!(model.values(x).dims(), [5]);
    }

    #[test]
    fn log_probs_agree_with_probabilities() {
        let device = Default::default();
        let model = ActorCritic::<TestBackend>::new(&device);
        let x = Tensor::<TestBackend, 2>::from_floats([[0.1, 0.0], [0.9, 1.0]], &device);

        let probs: Vec<f32> = model.probabilities(x.clone()).into_data().iter::<f32>().collect();
        let log_probs: Vec<f32> = model.log_probs(x).into_data().iter::<f32>().collect();

        for row in probs.chunks(ACTION_COUNT) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
        for (prob, log_prob) in probs.iter().zip(&log_probs) {
            assert!((log_prob.exp() - prob).abs() < 1e-5);
        }
    }
}
