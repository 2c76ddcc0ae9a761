//! Time-ordered trainer
//!
//! For one target: sort graded games chronologically, select features, drop
//! incomplete rows, score expanding-window folds, then refit on everything.

use super::folds::{expanding_window_folds, fold_count};
use super::metrics::{CvSummary, FoldMetrics};
use crate::config::{Config, TrainingConfig};
use crate::error::{PipelineError, Result};
use crate::features::{FeatureSelector, Matchup, MatchupTable};
use crate::model::{
    FeatureMatrix, FittedModel, GbmParams, GbmRegressor, Regressor, Target, TrainedModel,
};
use crate::telemetry::{record_quality, set_training_gauge, QualityMetric, TrainingGauge};
use chrono::Utc;

/// Complete training rows for one target
struct TrainingSet {
    keys: Vec<(i32, u32)>,
    features: FeatureMatrix,
    targets: Vec<f64>,
    dropped: usize,
}

pub struct Trainer<R = GbmRegressor> {
    regressor: R,
    selector: FeatureSelector,
    config: TrainingConfig,
}

impl Trainer<GbmRegressor> {
    pub fn new(config: &Config) -> Self {
        Self::with_regressor(
            GbmRegressor::new(GbmParams::from(&config.training)),
            config,
        )
    }
}

impl<R: Regressor> Trainer<R> {
    pub fn with_regressor(regressor: R, config: &Config) -> Self {
        Self {
            regressor,
            selector: FeatureSelector::from_config(&config.features),
            config: config.training.clone(),
        }
    }

    /// Fit and cross-validate a model for `target`
    pub fn train(&self, table: &MatchupTable, target: Target) -> Result<TrainedModel<R::Fitted>> {
        if !table.has_column(target.column()) {
            return Err(PipelineError::MissingTarget(target.column().to_string()));
        }

        let mut graded: Vec<&Matchup> = table
            .rows()
            .iter()
            .filter(|m| m.game.is_regular_season() && m.target(target.column()).is_some())
            .collect();
        graded.sort_by_key(|m| m.game.key());
        self.require_samples(target, graded.len())?;

        let feature_names = self.selector.select(&table.columns())?;
        let set = self.training_set(&graded, &feature_names, target)?;
        if set.dropped > 0 {
            tracing::warn!(
                target = %target,
                dropped = set.dropped,
                kept = set.targets.len(),
                "Dropped training rows with missing or non-finite values"
            );
            record_quality(QualityMetric::TrainingRowDropped, set.dropped);
        }
        self.require_samples(target, set.targets.len())?;

        let cv = self.cross_validate(&set, target)?;
        let model = self.regressor.fit(&set.features, &set.targets)?;

        let mut importance: Vec<(String, f64)> = feature_names
            .iter()
            .cloned()
            .zip(model.feature_importance())
            .collect();
        importance.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        set_training_gauge(TrainingGauge::CvMae, target.name(), cv.mae.mean);
        set_training_gauge(
            TrainingGauge::TrainingSamples,
            target.name(),
            set.targets.len() as f64,
        );
        set_training_gauge(
            TrainingGauge::FeatureCount,
            target.name(),
            feature_names.len() as f64,
        );
        tracing::info!(
            target = %target,
            samples = set.targets.len(),
            features = feature_names.len(),
            cv_mae = cv.mae.mean,
            cv_mae_std = cv.mae.std,
            "Trained final model on full history"
        );

        Ok(TrainedModel {
            target,
            feature_names,
            model,
            training_samples: set.targets.len(),
            rows_dropped: set.dropped,
            cv,
            importance,
            trained_at: Utc::now(),
        })
    }

    fn require_samples(&self, target: Target, found: usize) -> Result<()> {
        if found < self.config.min_samples {
            return Err(PipelineError::InsufficientSamples {
                target: target.name().to_string(),
                found,
                required: self.config.min_samples,
            });
        }
        Ok(())
    }

    fn training_set(
        &self,
        graded: &[&Matchup],
        feature_names: &[String],
        target: Target,
    ) -> Result<TrainingSet> {
        let mut keys = Vec::with_capacity(graded.len());
        let mut rows = Vec::with_capacity(graded.len());
        let mut targets = Vec::with_capacity(graded.len());
        let mut dropped = 0;

        for m in graded {
            let y = m.target(target.column()).filter(|y| y.is_finite());
            let values: Option<Vec<f64>> = m
                .values(feature_names)
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect();
            match (values, y) {
                (Some(values), Some(y)) => {
                    keys.push(m.game.key());
                    rows.push(values);
                    targets.push(y);
                }
                _ => dropped += 1,
            }
        }

        Ok(TrainingSet {
            keys,
            features: FeatureMatrix::from_rows(rows, feature_names.len())?,
            targets,
            dropped,
        })
    }

    fn cross_validate(&self, set: &TrainingSet, target: Target) -> Result<CvSummary> {
        let n = set.targets.len();
        let k = fold_count(n, self.config.min_folds, self.config.max_folds);
        let folds = expanding_window_folds(&set.keys, k);
        if folds.is_empty() {
            return Err(PipelineError::NoValidationFolds(target.name().to_string()));
        }
        if folds.len() < k {
            tracing::warn!(
                target = %target,
                requested = k,
                usable = folds.len(),
                "Some folds had no validation rows after week alignment"
            );
        }

        let mut results = Vec::with_capacity(folds.len());
        for (i, fold) in folds.iter().enumerate() {
            let train_x = set.features.slice_rows(fold.train.clone());
            let valid_x = set.features.slice_rows(fold.validation.clone());
            let model = self
                .regressor
                .fit(&train_x, &set.targets[fold.train.clone()])?;
            let predicted = model.predict(&valid_x);
            let metrics = FoldMetrics::compute(
                fold.train.len(),
                &set.targets[fold.validation.clone()],
                &predicted,
            );
            tracing::info!(
                target = %target,
                fold = i + 1,
                train_rows = metrics.train_rows,
                validation_rows = metrics.validation_rows,
                mae = metrics.mae,
                rmse = metrics.rmse,
                r2 = metrics.r2,
                "Validated fold"
            );
            results.push(metrics);
        }
        Ok(CvSummary::from_folds(&results))
    }
}
