//! Data-quality counters
//!
//! Every recoverable row-level issue is counted here as well as logged, so a
//! recorder installed by an embedding process sees the same numbers the CLI
//! prints.

/// Row-level data issues that are recovered locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMetric {
    /// Text cell in a metric column that did not parse as a number
    CoercionFailure,
    /// Training row excluded for a null/infinite feature or target
    TrainingRowDropped,
    /// Prediction cell replaced by zero
    PredictionZeroFill,
    /// Game without a team-week match for one or both sides
    UnmatchedGame,
    /// Team-week absent from the injury summary, treated as no injuries
    InjuryFill,
}

impl QualityMetric {
    pub fn name(self) -> &'static str {
        match self {
            QualityMetric::CoercionFailure => "gridiron_coercion_failures_total",
            QualityMetric::TrainingRowDropped => "gridiron_training_rows_dropped_total",
            QualityMetric::PredictionZeroFill => "gridiron_prediction_zero_fills_total",
            QualityMetric::UnmatchedGame => "gridiron_unmatched_games_total",
            QualityMetric::InjuryFill => "gridiron_injury_fills_total",
        }
    }
}

/// Gauges describing a training run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingGauge {
    /// Mean out-of-sample MAE across folds
    CvMae,
    /// Rows in the final fit
    TrainingSamples,
    /// Number of model inputs
    FeatureCount,
}

/// Record a data-quality count
pub fn record_quality(metric: QualityMetric, count: usize) {
    if count == 0 {
        return;
    }
    ::metrics::counter!(metric.name()).increment(count as u64);
    tracing::debug!(metric = metric.name(), count, "Recorded data-quality count");
}

/// Set a training gauge for a target
pub fn set_training_gauge(gauge: TrainingGauge, target: &'static str, value: f64) {
    let name = match gauge {
        TrainingGauge::CvMae => "gridiron_cv_mae_points",
        TrainingGauge::TrainingSamples => "gridiron_training_samples",
        TrainingGauge::FeatureCount => "gridiron_feature_count",
    };
    ::metrics::gauge!(name, "target" => target).set(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_distinct() {
        let all = [
            QualityMetric::CoercionFailure,
            QualityMetric::TrainingRowDropped,
            QualityMetric::PredictionZeroFill,
            QualityMetric::UnmatchedGame,
            QualityMetric::InjuryFill,
        ];
        let mut names: Vec<_> = all.iter().map(|m| m.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_quality(QualityMetric::CoercionFailure, 3);
        record_quality(QualityMetric::CoercionFailure, 0);
        set_training_gauge(TrainingGauge::CvMae, "margin", 10.2);
    }
}
