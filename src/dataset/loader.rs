//! Image-folder Dataset Loader
//!
//! Loads a labeled image collection from a directory tree whose immediate
//! subdirectories denote class labels:
//!
//! ```text
//! root_dir/
//! ├── daisy/
//! │   ├── image1.jpg
//! │   └── image2.jpg
//! ├── tulip/
//! │   └── ...
//! └── ...
//! ```
//!
//! Class names are sorted so the name-to-label mapping is stable across runs.
//! The dataset is immutable once loaded; image bytes are read lazily at
//! batch-assembly time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::IMAGE_EXTENSIONS;
use crate::utils::error::{Result, TuneError};

/// A single image sample with its label and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Class name (directory name)
    pub class_name: String,
}

/// Image-folder dataset with lazy image loading
#[derive(Debug)]
pub struct ImageFolderDataset {
    /// Root directory of the dataset
    pub root_dir: PathBuf,
    /// All samples in the dataset, ordered by class then discovery order
    pub samples: Vec<ImageSample>,
    /// Sorted class names; index = label
    pub classes: Vec<String>,
}

impl ImageFolderDataset {
    /// Open a dataset rooted at `root_dir`.
    ///
    /// Fails with a `Data` error when the root has no class subdirectories or
    /// when any class directory contains zero readable images. Individual
    /// files that later turn out to be corrupt are tolerated; only a class
    /// with nothing plausible in it is treated as a configuration mistake.
    pub fn open<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Loading image-folder dataset from: {:?}", root_dir);

        if !root_dir.exists() {
            return Err(TuneError::Data(format!(
                "dataset directory does not exist: {:?}",
                root_dir
            )));
        }

        let mut classes: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&root_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    classes.push(name.to_string());
                }
            }
        }
        classes.sort();

        if classes.is_empty() {
            return Err(TuneError::Data(format!(
                "no class subdirectories found under {:?}",
                root_dir
            )));
        }

        info!("Found {} classes", classes.len());

        let mut samples = Vec::new();
        for (label, class_name) in classes.iter().enumerate() {
            let class_dir = root_dir.join(class_name);
            let before = samples.len();

            for entry in WalkDir::new(&class_dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path().to_path_buf();

                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy().to_lowercase();
                    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                        samples.push(ImageSample {
                            path,
                            label,
                            class_name: class_name.clone(),
                        });
                    }
                }
            }

            let count = samples.len() - before;
            if count == 0 {
                return Err(TuneError::Data(format!(
                    "class directory '{}' contains no readable images",
                    class_name
                )));
            }

            debug!("Class '{}' (label {}): {} samples", class_name, label, count);
        }

        info!("Loaded {} total samples", samples.len());

        Ok(Self {
            root_dir,
            samples,
            classes,
        })
    }

    /// Get the number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of classes
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Get statistics about the dataset
    pub fn stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: self.num_classes(),
            class_counts,
            class_names: self
                .classes
                .iter()
                .enumerate()
                .map(|(idx, name)| (idx, name.clone()))
                .collect(),
        }
    }
}

/// Statistics about the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
    pub class_names: HashMap<usize, String>,
}

impl DatasetStats {
    /// Log the per-class distribution
    pub fn log(&self) {
        info!(
            "Dataset: {} samples across {} classes",
            self.total_samples, self.num_classes
        );

        let mut sorted: Vec<_> = self.class_names.iter().collect();
        sorted.sort_by_key(|(idx, _)| *idx);

        for (idx, name) in sorted {
            let count = self.class_counts[*idx];
            let pct = 100.0 * count as f64 / self.total_samples as f64;
            debug!("  {:3}. {:30} {:5} ({:.1}%)", idx, name, count, pct);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_image(path: &Path) {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([120, 80, 40]));
        img.save(path).unwrap();
    }

    fn folder_with(classes: &[(&str, usize)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, count) in classes {
            let class_dir = dir.path().join(name);
            std::fs::create_dir(&class_dir).unwrap();
            for i in 0..*count {
                write_image(&class_dir.join(format!("img_{}.png", i)));
            }
        }
        dir
    }

    #[test]
    fn test_open_assigns_sorted_labels() {
        let dir = folder_with(&[("tulip", 2), ("daisy", 3)]);
        let dataset = ImageFolderDataset::open(dir.path()).unwrap();

        assert_eq!(dataset.num_classes(), 2);
        assert_eq!(dataset.classes, vec!["daisy", "tulip"]);
        assert_eq!(dataset.len(), 5);

        let daisy: Vec<_> = dataset.samples.iter().filter(|s| s.label == 0).collect();
        assert_eq!(daisy.len(), 3);
        assert!(daisy.iter().all(|s| s.class_name == "daisy"));
    }

    #[test]
    fn test_open_rejects_empty_root() {
        let dir = TempDir::new().unwrap();
        let err = ImageFolderDataset::open(dir.path()).unwrap_err();
        assert!(matches!(err, TuneError::Data(_)));
    }

    #[test]
    fn test_open_rejects_empty_class() {
        let dir = folder_with(&[("daisy", 2)]);
        std::fs::create_dir(dir.path().join("rose")).unwrap();

        let err = ImageFolderDataset::open(dir.path()).unwrap_err();
        match err {
            TuneError::Data(msg) => assert!(msg.contains("rose")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_open_ignores_non_image_files() {
        let dir = folder_with(&[("daisy", 1)]);
        std::fs::write(dir.path().join("daisy").join("notes.txt"), "hi").unwrap();

        let dataset = ImageFolderDataset::open(dir.path()).unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn test_stats() {
        let dir = folder_with(&[("daisy", 3), ("tulip", 1)]);
        let dataset = ImageFolderDataset::open(dir.path()).unwrap();

        let stats = dataset.stats();
        assert_eq!(stats.total_samples, 4);
        assert_eq!(stats.class_counts, vec![3, 1]);
        assert_eq!(stats.class_names[&1], "tulip");
    }
}
