//! Final evaluation on the held-out test partition

use burn::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::epoch::run_eval_epoch;
use crate::dataset::{Augmenter, ImageBatcher, Partition};
use crate::model::FineTuneModel;
use crate::utils::error::Result;

/// Metrics of one evaluation over the test partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub average_loss: f64,
    pub accuracy: f64,
    pub correct: usize,
    pub total: usize,
}

impl TestReport {
    /// One-line summary in the classic `loss / correct-out-of-total` form
    pub fn summary(&self) -> String {
        format!(
            "Test set: Average loss: {:.4}, Accuracy: {}/{} ({:.0}%)",
            self.average_loss,
            self.correct,
            self.total,
            self.accuracy * 100.0
        )
    }
}

/// Evaluate the model once over a held-out partition.
///
/// The pass is read-only and deterministic: repeated calls with the same
/// model and partition produce the same report.
pub fn evaluate<B: Backend>(
    model: &FineTuneModel<B>,
    partition: &Partition,
    batch_size: usize,
    image_size: usize,
    device: &B::Device,
) -> Result<TestReport> {
    let batcher = ImageBatcher::new(image_size);
    let augmenter = Augmenter::new(image_size as u32);

    let stats = run_eval_epoch(model, partition, &batcher, &augmenter, batch_size, device)?;

    let report = TestReport {
        average_loss: stats.average_loss,
        accuracy: stats.accuracy,
        correct: stats.correct,
        total: stats.total,
    };
    info!("{}", report.summary());

    Ok(report)
}
