//! Model-input column selection
//!
//! Training and prediction both call [`FeatureSelector::select`] on the
//! matchup column set. Selection is by name only: every column carrying the
//! delta prefix (sorted by name) followed by the configured context columns
//! that exist, in configured order.

use crate::config::FeaturesConfig;
use crate::error::{PipelineError, Result};

/// Columns that carry the game outcome and may never be model inputs
pub const OUTCOME_COLUMNS: [&str; 4] = ["margin", "total_points", "home_score", "away_score"];

#[derive(Debug, Clone)]
pub struct FeatureSelector {
    delta_prefix: String,
    context_columns: Vec<String>,
    min_features: usize,
}

impl FeatureSelector {
    pub fn new(
        delta_prefix: impl Into<String>,
        context_columns: Vec<String>,
        min_features: usize,
    ) -> Self {
        Self {
            delta_prefix: delta_prefix.into(),
            context_columns,
            min_features,
        }
    }

    pub fn from_config(config: &FeaturesConfig) -> Self {
        Self::new(
            config.delta_prefix.clone(),
            config.context_columns.clone(),
            config.min_features,
        )
    }

    pub fn min_features(&self) -> usize {
        self.min_features
    }

    /// Ordered model inputs chosen from `columns`
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Vec<String>> {
        if let Some(leak) = self
            .context_columns
            .iter()
            .find(|c| OUTCOME_COLUMNS.contains(&c.as_str()))
        {
            return Err(PipelineError::LeakageColumn(leak.clone()));
        }

        let mut selected: Vec<String> = columns
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| c.starts_with(&self.delta_prefix))
            .filter(|c| !OUTCOME_COLUMNS.contains(c))
            .map(str::to_string)
            .collect();
        selected.sort_unstable();
        selected.dedup();

        for context in &self.context_columns {
            let present = columns.iter().any(|c| c.as_ref() == context);
            if present && !selected.contains(context) {
                selected.push(context.clone());
            }
        }

        if selected.is_empty() {
            return Err(PipelineError::EmptyFeatureSet);
        }
        if selected.len() < self.min_features {
            return Err(PipelineError::TooFewFeatures {
                found: selected.len(),
                required: self.min_features,
            });
        }
        Ok(selected)
    }
}
