//! Training module
//!
//! - [`controller`]: the train/validate loop with early stopping and
//!   best-head restoration
//! - [`epoch`]: single training and evaluation passes
//! - [`hook`]: optional instrumentation observer
//! - [`report`]: final evaluation on the held-out test partition

pub mod controller;
pub mod epoch;
pub mod hook;
pub mod report;

pub use controller::{
    BestTracker, EpochRecord, FitSummary, TrainingController, TrainingOptions,
};
pub use epoch::{run_eval_epoch, run_train_epoch, EpochStats};
pub use hook::{Hook, Mode, NullHook, TraceHook};
pub use report::{evaluate, TestReport};
