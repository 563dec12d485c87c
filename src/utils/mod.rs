//! Utility modules: error types and logging.

pub mod error;
pub mod logging;

pub use error::{Result, TuneError};
pub use logging::{init_logging, LogConfig};
