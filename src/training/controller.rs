//! Training controller
//!
//! Drives the train/validate loop: one training pass and one validation pass
//! per epoch, a best-score tracker deciding when to snapshot the head and
//! when to stop early, and a restore of the best head before the model is
//! handed back.
//!
//! The validation score is accuracy in percent. Only strict improvement over
//! the running best resets the patience counter; `tol` consecutive epochs
//! without improvement end the run.

use burn::module::AutodiffModule;
use burn::optim::Optimizer;
use burn::tensor::backend::AutodiffBackend;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::epoch::{run_eval_epoch, run_train_epoch, EpochStats};
use super::hook::{Hook, Mode};
use crate::dataset::{Augmenter, ImageBatcher, PartitionSet};
use crate::model::FineTuneModel;
use crate::utils::error::{Result, TuneError};
use crate::utils::logging::TrainingLogger;
use crate::IMAGE_SIZE;

/// Knobs of the training loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOptions {
    /// Upper bound on the number of epochs
    pub epochs: usize,
    /// Consecutive non-improving epochs tolerated before stopping
    pub tol: usize,
    /// Optimizer learning rate
    pub learning_rate: f64,
    /// Samples per batch
    pub batch_size: usize,
    /// Square input resolution images are resized to
    pub image_size: usize,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            epochs: 100,
            tol: 10,
            learning_rate: 1e-3,
            batch_size: 64,
            image_size: IMAGE_SIZE,
        }
    }
}

impl TrainingOptions {
    fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(TuneError::Config("epochs must be at least 1".to_string()));
        }
        if self.tol == 0 {
            return Err(TuneError::Config("tol must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(TuneError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(TuneError::Config(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Tracks the best validation score, the patience counter and the snapshot
/// taken at the best epoch.
///
/// The snapshot is an owned value overwritten on strict improvement; it
/// never aliases the live model. The payload type is generic so the
/// restore semantics can be tested without tensors.
#[derive(Debug)]
pub struct BestTracker<S> {
    best_score: f64,
    best_epoch: usize,
    stale: usize,
    tol: usize,
    snapshot: Option<S>,
}

impl<S> BestTracker<S> {
    pub fn new(tol: usize) -> Self {
        Self {
            // The first observed score always counts as an improvement
            best_score: f64::NEG_INFINITY,
            best_epoch: 0,
            stale: 0,
            tol,
            snapshot: None,
        }
    }

    /// Record one epoch's score. On strict improvement over the best seen so
    /// far the snapshot closure is invoked and its value kept; otherwise the
    /// patience counter advances. Returns whether the epoch improved.
    pub fn observe(&mut self, epoch: usize, score: f64, snapshot: impl FnOnce() -> S) -> bool {
        if score > self.best_score {
            self.best_score = score;
            self.best_epoch = epoch;
            self.stale = 0;
            self.snapshot = Some(snapshot());
            true
        } else {
            self.stale += 1;
            false
        }
    }

    /// Whether the patience budget is exhausted
    pub fn should_stop(&self) -> bool {
        self.stale >= self.tol
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }

    /// Consume the tracker, yielding the best-epoch snapshot
    pub fn into_snapshot(self) -> Option<S> {
        self.snapshot
    }
}

/// Per-epoch record kept in the fit summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub validation_loss: f64,
    pub validation_accuracy: f64,
    /// Validation accuracy in percent
    pub score: f64,
    pub improved: bool,
}

/// Outcome of one fit run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_score: f64,
    pub early_stopped: bool,
    pub history: Vec<EpochRecord>,
}

/// Owns one train/validate run over a partition set
pub struct TrainingController {
    options: TrainingOptions,
    seed: Option<u64>,
}

impl TrainingController {
    pub fn new(options: TrainingOptions, seed: Option<u64>) -> Self {
        Self { options, seed }
    }

    /// Fine-tune `model` on the partition set.
    ///
    /// Returns the model with its head restored to the best-scoring epoch,
    /// alongside the fit summary. The trunk is untouched throughout; only
    /// the head is snapshotted and restored.
    pub fn fit<B, O>(
        &self,
        mut model: FineTuneModel<B>,
        optimizer: &mut O,
        partitions: &PartitionSet,
        hook: &mut dyn Hook,
        device: &B::Device,
    ) -> Result<(FineTuneModel<B>, FitSummary)>
    where
        B: AutodiffBackend,
        O: Optimizer<FineTuneModel<B>, B>,
    {
        self.options.validate()?;

        if partitions.train.is_empty() {
            return Err(TuneError::Data("training partition is empty".to_string()));
        }
        if partitions.validation.is_empty() {
            return Err(TuneError::Data(
                "validation partition is empty; early stopping needs validation data"
                    .to_string(),
            ));
        }

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let augmenter = Augmenter::new(self.options.image_size as u32);
        let batcher = ImageBatcher::new(self.options.image_size);

        let mut tracker = BestTracker::new(self.options.tol);
        let mut history = Vec::new();
        let mut early_stopped = false;
        let mut logger = TrainingLogger::new(self.options.epochs);

        for epoch in 1..=self.options.epochs {
            logger.start_epoch(epoch);

            hook.set_mode(Mode::Train);
            let (updated, train_stats) = run_train_epoch(
                model,
                optimizer,
                &partitions.train,
                &batcher,
                &augmenter,
                self.options.batch_size,
                self.options.learning_rate,
                &mut rng,
                device,
            )?;
            model = updated;
            hook.record_loss(epoch, train_stats.average_loss);

            hook.set_mode(Mode::Eval);
            let val_stats =
                self.validate_epoch(&model, partitions, &batcher, &augmenter, device)?;
            let score = val_stats.accuracy * 100.0;

            let improved = tracker.observe(epoch, score, || model.head.clone());
            if improved {
                logger.log_new_best(score);
            }

            logger.end_epoch(
                train_stats.average_loss,
                train_stats.accuracy,
                val_stats.average_loss,
                score,
            );

            history.push(EpochRecord {
                epoch,
                train_loss: train_stats.average_loss,
                train_accuracy: train_stats.accuracy,
                validation_loss: val_stats.average_loss,
                validation_accuracy: val_stats.accuracy,
                score,
                improved,
            });

            if tracker.should_stop() {
                logger.log_early_stop(self.options.tol);
                early_stopped = true;
                break;
            }
        }

        let summary = FitSummary {
            epochs_run: history.len(),
            best_epoch: tracker.best_epoch(),
            best_score: tracker.best_score(),
            early_stopped,
            history,
        };

        // The first epoch always improves on NEG_INFINITY, so a snapshot
        // exists whenever the loop ran.
        model.head = tracker
            .into_snapshot()
            .expect("first epoch always records a snapshot");

        logger.log_complete(summary.epochs_run, summary.best_score);
        info!(
            "Best validation score {:.2}% at epoch {}",
            summary.best_score, summary.best_epoch
        );

        Ok((model, summary))
    }

    fn validate_epoch<B: AutodiffBackend>(
        &self,
        model: &FineTuneModel<B>,
        partitions: &PartitionSet,
        batcher: &ImageBatcher,
        augmenter: &Augmenter,
        device: &B::Device,
    ) -> Result<EpochStats> {
        // Evaluate on the inner backend so no autodiff graph is built
        let eval_model = model.valid();
        run_eval_epoch(
            &eval_model,
            &partitions.validation,
            batcher,
            augmenter,
            self.options.batch_size,
            device,
        )
    }
}
