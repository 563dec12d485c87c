//! Error Handling Module
//!
//! Defines the error taxonomy for imagetune operations.
//! Uses thiserror for ergonomic error definitions.
//!
//! Every error here is fatal: the core performs no local recovery, a failed
//! run aborts with a non-zero exit and leaves no partial checkpoint.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for imagetune operations
#[derive(Error, Debug)]
pub enum TuneError {
    /// Missing or invalid configuration (flags, environment, preconditions)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Empty or invalid dataset root
    #[error("Dataset error: {0}")]
    Data(String),

    /// Backbone name not present in the architecture registry
    #[error("Unknown model '{0}' (supported: resnet18, resnet34, resnet50)")]
    UnknownModel(String),

    /// Device or compute failure during forward/backward or persistence
    #[error("Compute error: {0}")]
    Compute(String),

    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    Image(PathBuf, String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for imagetune operations
pub type Result<T> = std::result::Result<T, TuneError>;
