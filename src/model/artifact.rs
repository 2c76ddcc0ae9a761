//! Persisted model artifact

use super::{FittedModel, GbmEnsemble, Target};
use crate::data::StagedWrites;
use crate::error::{PipelineError, Result};
use crate::training::CvSummary;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// A fitted model plus everything prediction needs to use it safely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel<M = GbmEnsemble> {
    pub target: Target,
    /// Input columns, frozen in training order
    pub feature_names: Vec<String>,
    pub model: M,
    pub training_samples: usize,
    /// Rows removed for null or non-finite values
    pub rows_dropped: usize,
    pub cv: CvSummary,
    /// (feature, normalised importance), largest first
    pub importance: Vec<(String, f64)>,
    pub trained_at: DateTime<Utc>,
}

impl<M: FittedModel> TrainedModel<M> {
    /// Predict from a row ordered like `feature_names`
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.model.predict_row(row)
    }

    pub fn importance_of(&self, feature: &str) -> f64 {
        self.importance
            .iter()
            .find(|(name, _)| name == feature)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }
}

impl<M: Serialize> TrainedModel<M> {
    /// Write the artifact into `staged`; it replaces `path` on commit
    pub fn stage(&self, staged: &mut StagedWrites, path: &Path) -> Result<()> {
        staged.stage(path, |file| {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
            Ok(())
        })
    }
}

impl<M: DeserializeOwned> TrainedModel<M> {
    pub fn load(path: &Path) -> Result<Self> {
        PipelineError::require_file(path, "trained model", "gridiron-edge train")?;
        let reader = BufReader::new(File::open(path)?);
        let model: Self = serde_json::from_reader(reader)?;
        tracing::debug!(
            path = ?path,
            target = %model.target,
            features = model.feature_names.len(),
            "Loaded model"
        );
        Ok(model)
    }

    /// Load `path` and require that it was trained for `target`
    pub fn load_target(path: &Path, target: Target) -> Result<Self> {
        let model = Self::load(path)?;
        if model.target != target {
            return Err(PipelineError::WrongTarget {
                path: path.to_path_buf(),
                expected: target.name().to_string(),
                found: model.target.name().to_string(),
            });
        }
        Ok(model)
    }
}
