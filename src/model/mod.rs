//! Model assembly: frozen backbone trunk plus trainable head
//!
//! [`FineTuneModel`] wires a registry backbone to a fresh classification
//! head. The trunk is frozen when the model is built, so optimizer steps
//! only touch head parameters; the head is the unit of checkpointing during
//! training (see the training controller's best-weights snapshot).

pub mod backbone;
pub mod head;

use std::path::Path;

use burn::module::Module;
use burn::prelude::*;
use burn::record::CompactRecorder;
use tracing::info;

use crate::utils::error::{Result, TuneError};
pub use backbone::{lookup, BackboneSpec, Trunk, REGISTRY};
pub use head::{head_hidden_layers, Head};

/// A pretrained-style backbone with a replaced classification head
#[derive(Module, Debug)]
pub struct FineTuneModel<B: Backend> {
    /// Frozen feature extractor
    pub trunk: Trunk<B>,
    /// Trainable classifier
    pub head: Head<B>,
}

impl<B: Backend> FineTuneModel<B> {
    /// Build a model for `model_name` from the backbone registry.
    ///
    /// Fails with `UnknownModel` for names outside the registry and with
    /// `Config` for a degenerate class count.
    pub fn build(
        model_name: &str,
        num_classes: usize,
        hidden: &[usize],
        device: &B::Device,
    ) -> Result<Self> {
        if num_classes < 2 {
            return Err(TuneError::Config(format!(
                "num_classes must be at least 2, got {}",
                num_classes
            )));
        }

        let spec = backbone::lookup(model_name)?;
        info!(
            "Building {} (feature dim {}) with head {:?} -> {}",
            spec.name, spec.feature_dim, hidden, num_classes
        );

        let trunk = Trunk::new(spec, device).no_grad();
        let head = Head::new(spec.feature_dim, hidden, num_classes, device);

        Ok(Self { trunk, head })
    }

    /// Forward pass: `[batch, 3, H, W]` images to `[batch, num_classes]`
    /// logits
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.trunk.forward(images);
        self.head.forward(features)
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.head.num_classes()
    }

    /// Persist the model record to `path` (the recorder appends its own
    /// extension)
    pub fn save<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        info!("Saving model checkpoint to {:?}", path);
        self.save_file(path, &CompactRecorder::new())
            .map_err(|e| TuneError::Compute(format!("failed to save checkpoint: {}", e)))
    }
}
