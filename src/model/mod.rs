//! Regression models
//!
//! Two independent regressors are fit per run, one per [`Target`]. The
//! learner sits behind the [`Regressor`] / [`FittedModel`] traits so the
//! trainer and predictor never depend on a concrete model type.

mod artifact;
mod gbm;

pub use artifact::TrainedModel;
pub use gbm::{GbmEnsemble, GbmParams, GbmRegressor};

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quantity a model predicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Home score minus away score
    Margin,
    /// Home score plus away score
    Total,
}

impl Target {
    /// Matchup column holding the target
    pub fn column(self) -> &'static str {
        match self {
            Target::Margin => "margin",
            Target::Total => "total_points",
        }
    }

    /// Short name used in file names and metric labels
    pub fn name(self) -> &'static str {
        match self {
            Target::Margin => "margin",
            Target::Total => "total",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dense row-major design matrix without missing values
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
}

impl FeatureMatrix {
    /// Build from rows; every row must have the same width
    pub fn from_rows(rows: Vec<Vec<f64>>, n_cols: usize) -> Result<Self> {
        let n_rows = rows.len();
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(PipelineError::Schema(format!(
                    "row {} has {} features, expected {}",
                    i,
                    row.len(),
                    n_cols
                )));
            }
            values.extend(row);
        }
        Ok(Self {
            values,
            n_rows,
            n_cols,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n_cols..(i + 1) * self.n_cols]
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.n_cols + col]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// Contiguous row range as a new matrix
    pub fn slice_rows(&self, range: std::ops::Range<usize>) -> FeatureMatrix {
        FeatureMatrix {
            values: self.values[range.start * self.n_cols..range.end * self.n_cols].to_vec(),
            n_rows: range.len(),
            n_cols: self.n_cols,
        }
    }
}

/// A learner that can be fit to a design matrix
pub trait Regressor {
    type Fitted: FittedModel;

    fn fit(&self, features: &FeatureMatrix, targets: &[f64]) -> Result<Self::Fitted>;
}

/// A fitted model
pub trait FittedModel {
    fn predict_row(&self, row: &[f64]) -> f64;

    fn predict(&self, features: &FeatureMatrix) -> Vec<f64> {
        features.rows().map(|r| self.predict_row(r)).collect()
    }

    /// Relative importance per input column, summing to 1 (all zeros if no split was made)
    fn feature_importance(&self) -> Vec<f64>;
}
