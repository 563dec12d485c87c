//! # imagetune
//!
//! A Rust library for fine-tuning pretrained image classifiers on custom
//! image-folder datasets using the Burn framework.
//!
//! The workflow mirrors classic transfer learning: a pretrained backbone is
//! frozen, its classification head is replaced with a freshly initialized
//! stack of linear layers sized to the target class count, and only that head
//! is trained. A validation-driven controller decides how long to train,
//! tracks the best head seen so far, and restores it before the checkpoint is
//! written.
//!
//! ## Modules
//!
//! - `dataset`: image-folder loading, train/validation/test partitioning,
//!   augmentation and batching
//! - `model`: backbone registry, frozen trunk and trainable head
//! - `training`: epoch runner, training controller with early stopping,
//!   evaluation reporter and instrumentation hooks
//! - `utils`: logging and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use imagetune::backend::TrainingBackend;
//! use imagetune::dataset::{ImageFolderDataset, PartitionSet, SplitConfig};
//! use imagetune::model::FineTuneModel;
//!
//! let dataset = ImageFolderDataset::open("data/flowers")?;
//! let partitions = PartitionSet::split(&dataset, &SplitConfig::default())?;
//! let model = FineTuneModel::<TrainingBackend>::build("resnet50", 5, &[], &device)?;
//! // ... fit with TrainingController, evaluate, save
//! ```

pub mod backend;
pub mod dataset;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::augmentation::Augmenter;
pub use dataset::batcher::{ImageBatch, ImageBatcher, ImageItem};
pub use dataset::loader::{DatasetStats, ImageFolderDataset, ImageSample};
pub use dataset::split::{Partition, PartitionSet, SplitConfig};
pub use model::backbone::{BackboneSpec, REGISTRY};
pub use model::FineTuneModel;
pub use training::controller::{FitSummary, TrainingController, TrainingOptions};
pub use training::hook::{Hook, Mode, NullHook, TraceHook};
pub use training::report::{evaluate, TestReport};
pub use utils::error::{Result, TuneError};

/// Input resolution fed to every backbone (square, in pixels)
pub const IMAGE_SIZE: usize = 224;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
