//! Convolutional backbones
//!
//! A static registry maps the supported backbone names to their architecture
//! parameters. The trunk built from a spec is the frozen feature extractor:
//! its parameters are excluded from gradient tracking at construction time,
//! so only the classification head trains.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{
    AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig,
};
use burn::nn::{BatchNorm, BatchNormConfig, PaddingConfig2d, Relu};
use burn::prelude::*;

use crate::utils::error::{Result, TuneError};

/// Architecture parameters for one supported backbone
#[derive(Debug, Clone, Copy)]
pub struct BackboneSpec {
    /// Registry key, e.g. `"resnet50"`
    pub name: &'static str,
    /// Channel width of each of the four stages
    pub stage_widths: [usize; 4],
    /// Number of conv blocks per stage
    pub blocks_per_stage: [usize; 4],
    /// Width of the pooled feature vector fed to the head
    pub feature_dim: usize,
}

/// All backbones this crate can build
pub const REGISTRY: [BackboneSpec; 3] = [
    BackboneSpec {
        name: "resnet18",
        stage_widths: [64, 128, 256, 512],
        blocks_per_stage: [2, 2, 2, 2],
        feature_dim: 512,
    },
    BackboneSpec {
        name: "resnet34",
        stage_widths: [64, 128, 256, 512],
        blocks_per_stage: [3, 4, 6, 3],
        feature_dim: 512,
    },
    BackboneSpec {
        name: "resnet50",
        stage_widths: [256, 512, 1024, 2048],
        blocks_per_stage: [3, 4, 6, 3],
        feature_dim: 2048,
    },
];

/// Resolve a backbone name against the registry
pub fn lookup(name: &str) -> Result<&'static BackboneSpec> {
    REGISTRY
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| TuneError::UnknownModel(name.to_string()))
}

/// Conv + batch norm + ReLU, with an optional downsampling max-pool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    activation: Relu,
    pool: Option<MaxPool2d>,
}

impl<B: Backend> ConvBlock<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, pool: bool, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);

        let pool = pool.then(|| MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init());

        Self {
            conv,
            bn: BatchNormConfig::new(out_channels).init(device),
            activation: Relu::new(),
            pool,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.activation.forward(x);
        // The 2x2 pool needs at least a 2x2 map; small inputs run out of
        // spatial extent before the deepest stages, so pooling stops there.
        let [_, _, h, w] = x.dims();
        match &self.pool {
            Some(pool) if h >= 2 && w >= 2 => pool.forward(x),
            _ => x,
        }
    }
}

/// The frozen feature extractor: staged conv blocks plus global pooling
#[derive(Module, Debug)]
pub struct Trunk<B: Backend> {
    blocks: Vec<ConvBlock<B>>,
    global_pool: AdaptiveAvgPool2d,
}

impl<B: Backend> Trunk<B> {
    /// Build a trunk from a registry spec
    pub fn new(spec: &BackboneSpec, device: &B::Device) -> Self {
        let mut blocks = Vec::new();

        // Stem: downsample early so deep stages work on small feature maps
        blocks.push(ConvBlock::new(3, spec.stage_widths[0], 2, true, device));

        let mut in_channels = spec.stage_widths[0];
        for (stage, (&width, &count)) in spec
            .stage_widths
            .iter()
            .zip(spec.blocks_per_stage.iter())
            .enumerate()
        {
            for block in 0..count {
                let downsample = stage > 0 && block == 0;
                blocks.push(ConvBlock::new(in_channels, width, 1, downsample, device));
                in_channels = width;
            }
        }

        Self {
            blocks,
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
        }
    }

    /// Extract a `[batch, feature_dim]` feature vector from an image batch
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = x;
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x = self.global_pool.forward(x);
        x.flatten(1, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;

    #[test]
    fn test_registry_names() {
        let names: Vec<_> = REGISTRY.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["resnet18", "resnet34", "resnet50"]);
    }

    #[test]
    fn test_lookup_known() {
        let spec = lookup("resnet50").unwrap();
        assert_eq!(spec.feature_dim, 2048);
        assert_eq!(spec.blocks_per_stage, [3, 4, 6, 3]);
    }

    #[test]
    fn test_lookup_unknown() {
        let err = lookup("vgg16").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("vgg16"));
        assert!(msg.contains("resnet50"));
    }

    #[test]
    fn test_trunk_output_shape() {
        let device = Default::default();
        let spec = lookup("resnet18").unwrap();
        let trunk = Trunk::<DefaultBackend>::new(spec, &device);

        let x = Tensor::zeros([2, 3, 32, 32], &device);
        let features = trunk.forward(x);
        assert_eq!(features.dims(), [2, 512]);
    }

    #[test]
    fn test_trunk_handles_small_inputs() {
        let device = Default::default();
        let spec = lookup("resnet18").unwrap();
        let trunk = Trunk::<DefaultBackend>::new(spec, &device);

        // Inputs that exhaust the spatial extent before the deepest stage
        for size in [16, 8] {
            let x = Tensor::zeros([1, 3, size, size], &device);
            let features = trunk.forward(x);
            assert_eq!(features.dims(), [1, 512]);
        }
    }
}
