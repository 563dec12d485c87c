//! Trainable classification head
//!
//! A stack of fully connected layers replacing the backbone's original
//! classifier. Hidden layer sizing follows the exponent convention of the
//! CLI: `num_layers` and `num_neurons` are exponents of two, so for example
//! (1, 9) yields two hidden layers of 512 units each.

use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Expand the CLI exponents into an explicit hidden-layer width list
pub fn head_hidden_layers(num_layers: u32, num_neurons: u32) -> Vec<usize> {
    vec![1usize << num_neurons; 1usize << num_layers]
}

/// Fully connected classifier head with ReLU between hidden layers
#[derive(Module, Debug)]
pub struct Head<B: Backend> {
    layers: Vec<Linear<B>>,
    activation: Relu,
}

impl<B: Backend> Head<B> {
    /// Build a head mapping `feature_dim` inputs through `hidden` widths to
    /// `num_classes` logits
    pub fn new(
        feature_dim: usize,
        hidden: &[usize],
        num_classes: usize,
        device: &B::Device,
    ) -> Self {
        let mut widths = Vec::with_capacity(hidden.len() + 2);
        widths.push(feature_dim);
        widths.extend_from_slice(hidden);
        widths.push(num_classes);

        let layers = widths
            .windows(2)
            .map(|pair| LinearConfig::new(pair[0], pair[1]).init(device))
            .collect();

        Self {
            layers,
            activation: Relu::new(),
        }
    }

    /// Map a `[batch, feature_dim]` feature batch to `[batch, num_classes]`
    /// logits. No activation after the final layer.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len() - 1;
        let mut x = x;
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            if i < last {
                x = self.activation.forward(x);
            }
        }
        x
    }

    /// Width of the logit layer
    pub fn num_classes(&self) -> usize {
        self.layers
            .last()
            .map(|layer| layer.weight.dims()[1])
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;

    #[test]
    fn test_hidden_layer_expansion() {
        // Defaults: one hidden layer of one unit
        assert_eq!(head_hidden_layers(0, 0), vec![1]);
        assert_eq!(head_hidden_layers(1, 9), vec![512, 512]);
        assert_eq!(head_hidden_layers(2, 3), vec![8, 8, 8, 8]);
        assert_eq!(head_hidden_layers(0, 4), vec![16]);
    }

    #[test]
    fn test_empty_hidden_is_single_linear_map() {
        let device = Default::default();
        let head = Head::<DefaultBackend>::new(32, &[], 5, &device);

        let x = Tensor::zeros([2, 32], &device);
        assert_eq!(head.forward(x).dims(), [2, 5]);
        assert_eq!(head.num_classes(), 5);
    }

    #[test]
    fn test_head_output_shape() {
        let device = Default::default();
        let head = Head::<DefaultBackend>::new(32, &[16, 16], 5, &device);

        let x = Tensor::zeros([4, 32], &device);
        assert_eq!(head.forward(x).dims(), [4, 5]);
        assert_eq!(head.num_classes(), 5);
    }

    #[test]
    fn test_cloned_head_matches_original() {
        let device = Default::default();
        let head = Head::<DefaultBackend>::new(8, &[4], 3, &device);
        let snapshot = head.clone();

        let x = Tensor::random([2, 8], burn::tensor::Distribution::Default, &device);
        let a: Vec<f32> = head.forward(x.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = snapshot.forward(x).into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }
}
