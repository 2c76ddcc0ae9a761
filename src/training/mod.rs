//! Time-ordered training and cross-validation

mod folds;
mod metrics;
mod trainer;

pub use folds::{expanding_window_folds, fold_count, Fold};
pub use metrics::{CvSummary, FoldMetrics, Spread};
pub use trainer::Trainer;
