//! Batching for image-folder partitions
//!
//! Loads individual samples into CHW float items and stacks them into
//! normalized Burn tensors. Channel normalization uses a fixed mean and
//! standard deviation of 0.5 per channel, matching the preprocessing the
//! backbones were trained with here.

use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use image::ImageReader;
use rand_chacha::ChaCha8Rng;

use super::augmentation::Augmenter;
use crate::utils::error::{Result, TuneError};

/// Per-channel normalization mean
pub const CHANNEL_MEAN: [f32; 3] = [0.5, 0.5, 0.5];

/// Per-channel normalization standard deviation
pub const CHANNEL_STD: [f32; 3] = [0.5, 0.5, 0.5];

/// A single sample ready for batching
#[derive(Clone, Debug)]
pub struct ImageItem {
    /// Image data as flattened CHW float array `[3 * size * size]` in [0, 1]
    pub image: Vec<f32>,
    /// Class label
    pub label: usize,
}

impl ImageItem {
    /// Create from pre-computed CHW data
    pub fn new(image: Vec<f32>, label: usize) -> Self {
        Self { image, label }
    }

    /// Load and preprocess one sample from disk.
    ///
    /// `augment` selects the training transform (random crop + flip, consuming
    /// randomness from `rng`) over the deterministic evaluation resize.
    /// Decode failures surface as `Image` errors so callers can skip corrupt
    /// files instead of aborting the pass.
    pub fn load(
        path: &Path,
        label: usize,
        augmenter: &Augmenter,
        augment: bool,
        rng: &mut ChaCha8Rng,
    ) -> Result<Self> {
        let img = ImageReader::open(path)
            .map_err(|e| TuneError::Image(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| TuneError::Image(path.to_path_buf(), e.to_string()))?;

        let view = if augment {
            augmenter.train_view(img, rng)
        } else {
            augmenter.eval_view(img)
        };

        Ok(Self {
            image: augmenter.to_chw(&view),
            label,
        })
    }
}

/// A batch of images and labels on the compute device
#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    /// Images with shape `[batch_size, 3, size, size]`, channel-normalized
    pub images: Tensor<B, 4>,
    /// Labels with shape `[batch_size]`
    pub targets: Tensor<B, 1, Int>,
}

/// Stacks [`ImageItem`]s into an [`ImageBatch`]
#[derive(Clone, Debug)]
pub struct ImageBatcher {
    image_size: usize,
}

impl ImageBatcher {
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let (channels, height, width) = (3, self.image_size, self.image_size);

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, height, width]),
            device,
        );

        let mean = Tensor::<B, 4>::from_floats(
            TensorData::new(CHANNEL_MEAN.to_vec(), [1, 3, 1, 1]),
            device,
        );
        let std = Tensor::<B, 4>::from_floats(
            TensorData::new(CHANNEL_STD.to_vec(), [1, 3, 1, 1]),
            device,
        );

        let images = (images - mean) / std;

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        ImageBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;

    #[test]
    fn test_batch_shapes() {
        let device = Default::default();
        let batcher = ImageBatcher::new(8);

        let items = vec![
            ImageItem::new(vec![0.0; 3 * 8 * 8], 0),
            ImageItem::new(vec![1.0; 3 * 8 * 8], 2),
        ];

        let batch: ImageBatch<DefaultBackend> = batcher.batch(items, &device);
        assert_eq!(batch.images.dims(), [2, 3, 8, 8]);
        assert_eq!(batch.targets.dims(), [2]);
    }

    #[test]
    fn test_batch_normalization() {
        let device = Default::default();
        let batcher = ImageBatcher::new(4);

        // Pixel value 1.0 maps to (1.0 - 0.5) / 0.5 = 1.0; 0.0 maps to -1.0.
        let items = vec![ImageItem::new(
            [vec![1.0f32; 16], vec![0.0f32; 32]].concat(),
            1,
        )];

        let batch: ImageBatch<DefaultBackend> = batcher.batch(items, &device);
        let values: Vec<f32> = batch.images.into_data().to_vec().unwrap();

        assert!((values[0] - 1.0).abs() < 1e-6);
        assert!((values[16] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_batch_targets() {
        let device = Default::default();
        let batcher = ImageBatcher::new(2);

        let items = vec![
            ImageItem::new(vec![0.5; 12], 3),
            ImageItem::new(vec![0.5; 12], 1),
        ];

        let batch: ImageBatch<DefaultBackend> = batcher.batch(items, &device);
        let targets: Vec<i64> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![3, 1]);
    }
}
