//! Dataset module for image-folder data handling
//!
//! This module provides functionality for:
//! - Loading a labeled image collection from a directory hierarchy
//!   (top-level subdirectory name = class label)
//! - Randomized, disjoint and exhaustive train/validation/test partitioning
//! - Augmentation for the training stream (random crop + horizontal flip)
//! - Batching into normalized Burn tensors
//!
//! The split ratios are fixed at 0.8/0.1/0.1. The training partition shuffles
//! its batch order on every pass; validation and test preserve a fixed order
//! so evaluation stays reproducible.

pub mod augmentation;
pub mod batcher;
pub mod loader;
pub mod split;

// Re-export main types for convenience
pub use augmentation::Augmenter;
pub use batcher::{ImageBatch, ImageBatcher, ImageItem};
pub use loader::{DatasetStats, ImageFolderDataset, ImageSample};
pub use split::{Partition, PartitionSet, SplitConfig};

/// Fraction of samples assigned to the training partition
pub const TRAIN_FRACTION: f64 = 0.8;

/// Fraction of samples assigned to the validation partition
pub const VALIDATION_FRACTION: f64 = 0.1;

/// File extensions treated as readable images
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];
