//! Configuration types for gridiron-edge

use crate::error::{PipelineError, Result};
use crate::model::Target;
use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Root of raw inputs and processed tables
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Persisted model artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    /// Prediction and importance reports
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_model_dir() -> PathBuf {
    PathBuf::from("./models")
}
fn default_reports_dir() -> PathBuf {
    PathBuf::from("./reports")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            model_dir: default_model_dir(),
            reports_dir: default_reports_dir(),
        }
    }
}

impl PathsConfig {
    /// Raw schedule table
    pub fn schedule_file(&self) -> PathBuf {
        self.data_dir.join("raw").join("schedules.parquet")
    }

    /// Directory holding the upstream per-week offense/defense/injury exports
    pub fn week_source_dir(&self, week: u32) -> PathBuf {
        self.data_dir.join("features").join(format!("week{}", week))
    }

    /// Unified team-week feature table
    pub fn team_week_file(&self) -> PathBuf {
        self.data_dir.join("processed").join("team_week.parquet")
    }

    /// Matchup table (training and prediction input)
    pub fn model_table_file(&self) -> PathBuf {
        self.data_dir.join("processed").join("model_table.parquet")
    }

    /// Persisted model for a target
    pub fn model_file(&self, target: Target) -> PathBuf {
        self.model_dir.join(format!("{}_model.json", target.name()))
    }

    /// Weekly prediction output
    pub fn predictions_file(&self, season: i32, week: u32) -> PathBuf {
        self.reports_dir
            .join(format!("week_{}_{}_predictions.parquet", season, week))
    }

    /// Feature importance report
    pub fn importance_file(&self) -> PathBuf {
        self.reports_dir.join("feature_importance.parquet")
    }
}

/// How team-week features are matched to a game week
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Same season and week only
    #[default]
    Exact,
    /// Latest record of the same season at or before the game week
    AsOf,
}

/// Feature assembly and selection
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturesConfig {
    /// Base feature names that get a home-minus-away delta
    #[serde(default = "default_delta_bases")]
    pub delta_bases: Vec<String>,

    /// Prefix that marks delta columns for selection
    #[serde(default = "default_delta_prefix")]
    pub delta_prefix: String,

    /// Non-delta columns always passed to the model when present
    #[serde(default = "default_context_columns")]
    pub context_columns: Vec<String>,

    /// Fewer selected features than this is a configuration error
    #[serde(default = "default_min_features")]
    pub min_features: usize,

    #[serde(default)]
    pub join: JoinPolicy,

    /// Keep games whose team features are missing (features propagate as null)
    #[serde(default = "default_true")]
    pub keep_unmatched: bool,
}

/// Canonical delta whitelist
pub const DEFAULT_DELTA_BASES: [&str; 16] = [
    "off_avg_epa_pass",
    "off_avg_epa_run",
    "off_success_rate",
    "def_avg_epa_per_play",
    "def_success_rate_allowed",
    "off_epa_l3",
    "off_sr_l3",
    "def_epa_l3",
    "def_sr_l3",
    "off_third_down_rate",
    "off_red_zone_td_rate",
    "off_two_min_td_rate",
    "def_third_down_rate",
    "def_turnover_rate",
    "off_plays_per_game",
    "injury_impact",
];

fn default_delta_bases() -> Vec<String> {
    DEFAULT_DELTA_BASES.iter().map(|s| s.to_string()).collect()
}
fn default_delta_prefix() -> String {
    "delta_".to_string()
}
fn default_context_columns() -> Vec<String> {
    vec![
        "home_injury_impact".to_string(),
        "away_injury_impact".to_string(),
    ]
}
fn default_min_features() -> usize {
    5
}
fn default_true() -> bool {
    true
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            delta_bases: default_delta_bases(),
            delta_prefix: default_delta_prefix(),
            context_columns: default_context_columns(),
            min_features: default_min_features(),
            join: JoinPolicy::Exact,
            keep_unmatched: true,
        }
    }
}

/// Model training configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Graded games required before training is attempted
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_min_folds")]
    pub min_folds: usize,
    #[serde(default = "default_max_folds")]
    pub max_folds: usize,
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Row sampling ratio per tree
    #[serde(default = "default_subsample")]
    pub subsample: f64,
    /// Column sampling ratio per tree
    #[serde(default = "default_subsample")]
    pub colsample: f64,
    /// L2 penalty on leaf weights
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    #[serde(default = "default_min_child_weight")]
    pub min_child_weight: f64,
    #[serde(default = "default_max_bins")]
    pub max_bins: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_min_samples() -> usize {
    100
}
fn default_min_folds() -> usize {
    2
}
fn default_max_folds() -> usize {
    5
}
fn default_n_estimators() -> usize {
    400
}
fn default_max_depth() -> usize {
    5
}
fn default_learning_rate() -> f64 {
    0.05
}
fn default_subsample() -> f64 {
    0.9
}
fn default_lambda() -> f64 {
    2.0
}
fn default_min_child_weight() -> f64 {
    1.0
}
fn default_max_bins() -> usize {
    64
}
fn default_seed() -> u64 {
    42
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
            min_folds: default_min_folds(),
            max_folds: default_max_folds(),
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            learning_rate: default_learning_rate(),
            subsample: default_subsample(),
            colsample: default_subsample(),
            lambda: default_lambda(),
            min_child_weight: default_min_child_weight(),
            max_bins: default_max_bins(),
            seed: default_seed(),
        }
    }
}

/// Historical standard deviation of margin prediction error, in points
pub const DEFAULT_MARGIN_SIGMA: f64 = 13.86;

/// Prediction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    /// Sigma of the normal margin distribution used for win probability
    #[serde(default = "default_margin_sigma")]
    pub margin_sigma: f64,
    /// Spread edges at or above this many points are flagged in the summary
    #[serde(default = "default_edge_alert_points")]
    pub edge_alert_points: f64,
    #[serde(default)]
    pub sort_by_kickoff: bool,
}

fn default_margin_sigma() -> f64 {
    DEFAULT_MARGIN_SIGMA
}
fn default_edge_alert_points() -> f64 {
    2.0
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            margin_sigma: DEFAULT_MARGIN_SIGMA,
            edge_alert_points: default_edge_alert_points(),
            sort_by_kickoff: false,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no stage can work with
    pub fn validate(&self) -> Result<()> {
        let f = &self.features;
        if f.delta_bases.is_empty() {
            return Err(PipelineError::Config(
                "features.delta_bases must not be empty".into(),
            ));
        }
        if f.delta_prefix.is_empty() {
            return Err(PipelineError::Config(
                "features.delta_prefix must not be empty".into(),
            ));
        }
        if f.min_features == 0 {
            return Err(PipelineError::Config(
                "features.min_features must be at least 1".into(),
            ));
        }

        let t = &self.training;
        if t.min_samples < 2 {
            return Err(PipelineError::Config(
                "training.min_samples must be at least 2".into(),
            ));
        }
        if t.min_folds < 2 || t.min_folds > t.max_folds {
            return Err(PipelineError::Config(format!(
                "training folds must satisfy 2 <= min_folds <= max_folds (got {}..{})",
                t.min_folds, t.max_folds
            )));
        }
        if t.n_estimators == 0 || t.max_depth == 0 {
            return Err(PipelineError::Config(
                "training.n_estimators and training.max_depth must be positive".into(),
            ));
        }
        if !(t.learning_rate > 0.0 && t.learning_rate <= 1.0) {
            return Err(PipelineError::Config(
                "training.learning_rate must be in (0, 1]".into(),
            ));
        }
        for (name, ratio) in [("subsample", t.subsample), ("colsample", t.colsample)] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(PipelineError::Config(format!(
                    "training.{} must be in (0, 1]",
                    name
                )));
            }
        }
        if t.lambda < 0.0 || t.min_child_weight < 0.0 {
            return Err(PipelineError::Config(
                "training.lambda and training.min_child_weight must be non-negative".into(),
            ));
        }
        if !(2..=1024).contains(&t.max_bins) {
            return Err(PipelineError::Config(
                "training.max_bins must be between 2 and 1024".into(),
            ));
        }

        let p = &self.prediction;
        if !(p.margin_sigma.is_finite() && p.margin_sigma > 0.0) {
            return Err(PipelineError::Config(
                "prediction.margin_sigma must be a positive number".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_empty_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.training.min_samples, 100);
        assert_eq!(config.training.n_estimators, 400);
        assert_eq!(config.features.delta_bases.len(), 16);
        assert_eq!(config.features.join, JoinPolicy::Exact);
        assert!(config.features.keep_unmatched);
        assert_eq!(config.prediction.margin_sigma, DEFAULT_MARGIN_SIGMA);
    }

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [paths]
            data_dir = "/srv/nfl/data"

            [features]
            join = "as_of"
            min_features = 3
            context_columns = []

            [training]
            n_estimators = 50
            learning_rate = 0.1

            [prediction]
            margin_sigma = 13.5
            sort_by_kickoff = true

            [telemetry]
            log_level = "debug"
            json_logs = true
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("/srv/nfl/data"));
        assert_eq!(config.features.join, JoinPolicy::AsOf);
        assert!(config.features.context_columns.is_empty());
        assert_eq!(config.training.n_estimators, 50);
        assert_eq!(config.training.max_depth, 5);
        assert_eq!(config.prediction.margin_sigma, 13.5);
        assert!(config.telemetry.json_logs);
    }

    #[test]
    fn test_config_rejects_bad_sigma() {
        let result = Config::from_toml("[prediction]\nmargin_sigma = 0.0\n");
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_config_rejects_bad_folds() {
        let result = Config::from_toml("[training]\nmin_folds = 6\nmax_folds = 5\n");
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_config_rejects_bad_subsample() {
        let result = Config::from_toml("[training]\nsubsample = 1.5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/gridiron.toml");
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }

    #[test]
    fn test_paths() {
        let paths = PathsConfig::default();
        assert_eq!(
            paths.week_source_dir(9),
            PathBuf::from("./data/features/week9")
        );
        assert_eq!(
            paths.model_file(Target::Margin),
            PathBuf::from("./models/margin_model.json")
        );
        assert_eq!(
            paths.predictions_file(2025, 10),
            PathBuf::from("./reports/week_2025_10_predictions.parquet")
        );
    }
}
