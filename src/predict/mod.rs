//! Prediction: scoring, win probability and reporting

mod predictor;
mod report;
mod win_prob;

pub use predictor::{predictions_to_frame, PredictionRecord, Predictor};
pub use report::format_predictions;
pub use win_prob::{normal_cdf, win_probability};
