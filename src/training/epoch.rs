//! Single-epoch passes over a partition
//!
//! One training pass updates head parameters batch by batch; one evaluation
//! pass only accumulates metrics. Images are loaded lazily per batch, and a
//! file that fails to decode is skipped with a warning instead of aborting
//! the pass.

use burn::data::dataloader::batcher::Batcher;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::dataset::{Augmenter, ImageBatch, ImageBatcher, ImageItem, Partition};
use crate::model::FineTuneModel;
use crate::utils::error::{Result, TuneError};

/// Metrics accumulated over one pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    /// Example-weighted mean loss
    pub average_loss: f64,
    /// Fraction of correctly classified examples in [0, 1]
    pub accuracy: f64,
    /// Correctly classified examples
    pub correct: usize,
    /// Examples seen (corrupt files excluded)
    pub total: usize,
}

struct Accumulator {
    loss_sum: f64,
    correct: usize,
    total: usize,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            loss_sum: 0.0,
            correct: 0,
            total: 0,
        }
    }

    fn add(&mut self, loss: f64, correct: usize, count: usize) {
        self.loss_sum += loss * count as f64;
        self.correct += correct;
        self.total += count;
    }

    fn finish(self, partition: &Partition) -> Result<EpochStats> {
        if self.total == 0 {
            return Err(TuneError::Data(format!(
                "no readable images in {} partition",
                partition.name()
            )));
        }
        Ok(EpochStats {
            average_loss: self.loss_sum / self.total as f64,
            accuracy: self.correct as f64 / self.total as f64,
            correct: self.correct,
            total: self.total,
        })
    }
}

fn load_batch(
    partition: &Partition,
    indices: &[usize],
    augmenter: &Augmenter,
    rng: &mut ChaCha8Rng,
) -> Vec<ImageItem> {
    indices
        .iter()
        .filter_map(|&i| {
            let (path, label) = &partition.samples()[i];
            match ImageItem::load(path, *label, augmenter, partition.augment(), rng) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!("Skipping unreadable image: {}", e);
                    None
                }
            }
        })
        .collect()
}

fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predictions = logits.argmax(1).squeeze::<1>(1);
    predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

/// Run one training pass over the partition, returning the updated model.
///
/// The sample order is reshuffled through `rng` and each sample gets a fresh
/// augmentation, so repeated passes see different views of the data.
#[allow(clippy::too_many_arguments)]
pub fn run_train_epoch<B, O>(
    mut model: FineTuneModel<B>,
    optimizer: &mut O,
    partition: &Partition,
    batcher: &ImageBatcher,
    augmenter: &Augmenter,
    batch_size: usize,
    learning_rate: f64,
    rng: &mut ChaCha8Rng,
    device: &B::Device,
) -> Result<(FineTuneModel<B>, EpochStats)>
where
    B: AutodiffBackend,
    O: Optimizer<FineTuneModel<B>, B>,
{
    let order = partition.epoch_order(rng);
    let mut acc = Accumulator::new();

    for chunk in order.chunks(batch_size) {
        let items = load_batch(partition, chunk, augmenter, rng);
        if items.is_empty() {
            continue;
        }
        let count = items.len();

        let batch: ImageBatch<B> = batcher.batch(items, device);
        let logits = model.forward(batch.images);
        let loss = CrossEntropyLossConfig::new()
            .init(device)
            .forward(logits.clone(), batch.targets.clone());

        let loss_value = loss.clone().into_scalar().elem::<f64>();
        let correct = count_correct(logits, batch.targets);

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optimizer.step(learning_rate, model, grads);

        acc.add(loss_value, correct, count);
    }

    let stats = acc.finish(partition)?;
    Ok((model, stats))
}

/// Run one evaluation pass over the partition without updating the model.
///
/// Samples are visited in the partition's fixed order with the deterministic
/// resize, so the result only depends on the model parameters.
pub fn run_eval_epoch<B: Backend>(
    model: &FineTuneModel<B>,
    partition: &Partition,
    batcher: &ImageBatcher,
    augmenter: &Augmenter,
    batch_size: usize,
    device: &B::Device,
) -> Result<EpochStats> {
    // Evaluation never consumes randomness; the rng is only part of the
    // shared loading path.
    let mut rng = <ChaCha8Rng as rand::SeedableRng>::seed_from_u64(0);
    let order = partition.epoch_order(&mut rng);
    let mut acc = Accumulator::new();

    for chunk in order.chunks(batch_size) {
        let items = load_batch(partition, chunk, augmenter, &mut rng);
        if items.is_empty() {
            continue;
        }
        let count = items.len();

        let batch: ImageBatch<B> = batcher.batch(items, device);
        let logits = model.forward(batch.images);
        let loss = CrossEntropyLossConfig::new()
            .init(device)
            .forward(logits.clone(), batch.targets.clone());

        let loss_value = loss.into_scalar().elem::<f64>();
        let correct = count_correct(logits, batch.targets);

        acc.add(loss_value, correct, count);
    }

    acc.finish(partition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DefaultBackend, TrainingBackend};
    use crate::dataset::{ImageFolderDataset, PartitionSet, SplitConfig};
    use burn::optim::AdamConfig;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn tiny_dataset() -> (TempDir, ImageFolderDataset) {
        let dir = TempDir::new().unwrap();
        for (class, color) in [("a", [200u8, 30, 30]), ("b", [30, 30, 200])] {
            let class_dir = dir.path().join(class);
            std::fs::create_dir(&class_dir).unwrap();
            for i in 0..4 {
                let img = image::RgbImage::from_pixel(16, 16, image::Rgb(color));
                img.save(class_dir.join(format!("{}.png", i))).unwrap();
            }
        }
        let dataset = ImageFolderDataset::open(dir.path()).unwrap();
        (dir, dataset)
    }

    fn partitions(dataset: &ImageFolderDataset) -> PartitionSet {
        let config = SplitConfig {
            train_fraction: 0.5,
            validation_fraction: 0.25,
            seed: Some(1),
        };
        PartitionSet::split(dataset, &config).unwrap()
    }

    #[test]
    fn test_train_epoch_covers_partition() {
        let (_dir, dataset) = tiny_dataset();
        let set = partitions(&dataset);
        let device = Default::default();

        let model =
            FineTuneModel::<TrainingBackend>::build("resnet18", 2, &[8], &device).unwrap();
        let mut optimizer = AdamConfig::new().init();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let (_model, stats) = run_train_epoch(
            model,
            &mut optimizer,
            &set.train,
            &ImageBatcher::new(16),
            &Augmenter::new(16),
            2,
            1e-3,
            &mut rng,
            &device,
        )
        .unwrap();

        assert_eq!(stats.total, set.train.len());
        assert!(stats.average_loss.is_finite());
        assert!(stats.accuracy >= 0.0 && stats.accuracy <= 1.0);
    }

    #[test]
    fn test_eval_epoch_is_deterministic() {
        let (_dir, dataset) = tiny_dataset();
        let set = partitions(&dataset);
        let device = Default::default();

        let model =
            FineTuneModel::<DefaultBackend>::build("resnet18", 2, &[8], &device).unwrap();
        let batcher = ImageBatcher::new(16);
        let augmenter = Augmenter::new(16);

        let a = run_eval_epoch(&model, &set.validation, &batcher, &augmenter, 2, &device)
            .unwrap();
        let b = run_eval_epoch(&model, &set.validation, &batcher, &augmenter, 2, &device)
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.total, set.validation.len());
    }

    #[test]
    fn test_corrupt_image_is_skipped() {
        let (dir, _) = tiny_dataset();
        std::fs::write(dir.path().join("a").join("broken.png"), b"not a png").unwrap();
        let dataset = ImageFolderDataset::open(dir.path()).unwrap();

        let device = Default::default();
        let model =
            FineTuneModel::<DefaultBackend>::build("resnet18", 2, &[8], &device).unwrap();

        let config = SplitConfig {
            train_fraction: 0.0,
            validation_fraction: 0.99,
            seed: Some(1),
        };
        let set = PartitionSet::split(&dataset, &config).unwrap();

        let stats = run_eval_epoch(
            &model,
            &set.validation,
            &ImageBatcher::new(16),
            &Augmenter::new(16),
            4,
            &device,
        )
        .unwrap();

        // The corrupt file is in the partition but not in the counts
        assert!(stats.total < dataset.len());
    }
}
