//! Dataset partitioning
//!
//! Splits a loaded [`ImageFolderDataset`] into three disjoint partitions
//! covering the full index range exactly once:
//!
//! 1. **Train (80%)** - augmented, batch order reshuffled every pass
//! 2. **Validation (10%)** - deterministic resize, fixed order; drives early
//!    stopping
//! 3. **Test (10%)** - deterministic resize, fixed order; held out for the
//!    final report
//!
//! Assignment is randomized. Without an explicit seed two runs produce
//! different (but still valid) partitions; callers that need reproducibility
//! inject one.

use std::path::PathBuf;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::loader::ImageFolderDataset;
use super::{TRAIN_FRACTION, VALIDATION_FRACTION};
use crate::utils::error::{Result, TuneError};

/// Configuration for dataset splitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of data for the training partition
    pub train_fraction: f64,
    /// Fraction of data for the validation partition
    pub validation_fraction: f64,
    /// Optional seed; `None` draws the assignment from entropy
    pub seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_fraction: TRAIN_FRACTION,
            validation_fraction: VALIDATION_FRACTION,
            seed: None,
        }
    }
}

impl SplitConfig {
    /// Create a seeded configuration with the default 0.8/0.1/0.1 ratios
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.train_fraction)
            || !(0.0..1.0).contains(&self.validation_fraction)
            || self.train_fraction + self.validation_fraction >= 1.0
        {
            return Err(TuneError::Config(
                "train + validation fractions must each lie in [0, 1) and sum below 1.0"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// A read-only view over a disjoint subset of dataset samples
#[derive(Debug, Clone)]
pub struct Partition {
    name: &'static str,
    samples: Vec<(PathBuf, usize)>,
    /// Training stream: augment samples and reshuffle order every pass
    augment: bool,
}

impl Partition {
    fn new(name: &'static str, samples: Vec<(PathBuf, usize)>, augment: bool) -> Self {
        Self {
            name,
            samples,
            augment,
        }
    }

    /// Partition name ("train", "validation" or "test")
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of samples in this partition
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the partition holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether samples from this partition are augmented when loaded
    pub fn augment(&self) -> bool {
        self.augment
    }

    /// The `(path, label)` pairs in this partition, in fixed order
    pub fn samples(&self) -> &[(PathBuf, usize)] {
        &self.samples
    }

    /// Sample order for one pass over the partition.
    ///
    /// The training partition reshuffles on every call; evaluation partitions
    /// always return the identity order.
    pub fn epoch_order(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.samples.len()).collect();
        if self.augment {
            indices.shuffle(rng);
        }
        indices
    }
}

/// The three partitions produced by one split
#[derive(Debug, Clone)]
pub struct PartitionSet {
    pub train: Partition,
    pub validation: Partition,
    pub test: Partition,
}

impl PartitionSet {
    /// Randomly assign every dataset sample to exactly one partition.
    ///
    /// The three partitions are disjoint and exhaustive by construction: a
    /// single shuffled index vector is cut at the train and validation
    /// boundaries and the remainder becomes the test partition.
    pub fn split(dataset: &ImageFolderDataset, config: &SplitConfig) -> Result<Self> {
        config.validate()?;

        if dataset.is_empty() {
            return Err(TuneError::Data("cannot split an empty dataset".to_string()));
        }

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let n = dataset.len();
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);

        let n_train = (n as f64 * config.train_fraction) as usize;
        let n_val = (n as f64 * config.validation_fraction) as usize;

        let collect = |range: &[usize]| -> Vec<(PathBuf, usize)> {
            range
                .iter()
                .map(|&i| {
                    let s = &dataset.samples[i];
                    (s.path.clone(), s.label)
                })
                .collect()
        };

        let train = Partition::new("train", collect(&indices[..n_train]), true);
        let validation = Partition::new(
            "validation",
            collect(&indices[n_train..n_train + n_val]),
            false,
        );
        let test = Partition::new("test", collect(&indices[n_train + n_val..]), false);

        info!(
            "Split {} samples: {} train / {} validation / {} test",
            n,
            train.len(),
            validation.len(),
            test.len()
        );

        Ok(Self {
            train,
            validation,
            test,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn synthetic_dataset(n: usize) -> ImageFolderDataset {
        let samples = (0..n)
            .map(|i| super::super::loader::ImageSample {
                path: PathBuf::from(format!("class_{}/img_{}.jpg", i % 3, i)),
                label: i % 3,
                class_name: format!("class_{}", i % 3),
            })
            .collect();

        ImageFolderDataset {
            root_dir: PathBuf::from("synthetic"),
            samples,
            classes: vec![
                "class_0".to_string(),
                "class_1".to_string(),
                "class_2".to_string(),
            ],
        }
    }

    fn paths(p: &Partition) -> HashSet<PathBuf> {
        p.samples().iter().map(|(path, _)| path.clone()).collect()
    }

    #[test]
    fn test_partitions_disjoint_and_exhaustive() {
        let dataset = synthetic_dataset(100);
        let set = PartitionSet::split(&dataset, &SplitConfig::seeded(7)).unwrap();

        let train = paths(&set.train);
        let val = paths(&set.validation);
        let test = paths(&set.test);

        assert!(train.is_disjoint(&val));
        assert!(train.is_disjoint(&test));
        assert!(val.is_disjoint(&test));

        let union: HashSet<_> = train.union(&val).cloned().collect();
        let union: HashSet<_> = union.union(&test).cloned().collect();
        assert_eq!(union.len(), 100);

        assert_eq!(set.train.len(), 80);
        assert_eq!(set.validation.len(), 10);
        assert_eq!(set.test.len(), 10);
    }

    #[test]
    fn test_different_seeds_differ_but_stay_valid() {
        let dataset = synthetic_dataset(50);
        let a = PartitionSet::split(&dataset, &SplitConfig::seeded(1)).unwrap();
        let b = PartitionSet::split(&dataset, &SplitConfig::seeded(2)).unwrap();

        assert_eq!(a.train.len(), b.train.len());
        assert_ne!(paths(&a.train), paths(&b.train));

        let union: HashSet<_> = paths(&b.train)
            .union(&paths(&b.validation))
            .cloned()
            .collect();
        let union: HashSet<_> = union.union(&paths(&b.test)).cloned().collect();
        assert_eq!(union.len(), 50);
    }

    #[test]
    fn test_same_seed_reproduces_split() {
        let dataset = synthetic_dataset(60);
        let a = PartitionSet::split(&dataset, &SplitConfig::seeded(42)).unwrap();
        let b = PartitionSet::split(&dataset, &SplitConfig::seeded(42)).unwrap();

        assert_eq!(paths(&a.train), paths(&b.train));
        assert_eq!(paths(&a.test), paths(&b.test));
    }

    #[test]
    fn test_train_order_reshuffles_eval_order_fixed() {
        let dataset = synthetic_dataset(40);
        let set = PartitionSet::split(&dataset, &SplitConfig::seeded(3)).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let first = set.train.epoch_order(&mut rng);
        let second = set.train.epoch_order(&mut rng);
        assert_ne!(first, second);

        let val_first = set.validation.epoch_order(&mut rng);
        let val_second = set.validation.epoch_order(&mut rng);
        assert_eq!(val_first, val_second);
        assert_eq!(val_first, (0..set.validation.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_fractions_rejected() {
        let dataset = synthetic_dataset(10);
        let config = SplitConfig {
            train_fraction: 0.95,
            validation_fraction: 0.1,
            seed: Some(1),
        };
        assert!(matches!(
            PartitionSet::split(&dataset, &config),
            Err(TuneError::Config(_))
        ));
    }
}
