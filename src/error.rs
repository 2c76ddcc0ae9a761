//! Pipeline error taxonomy
//!
//! Every fatal variant names the command that produces the missing piece, so
//! the operator always knows which upstream step to re-run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the feature, training and prediction stages
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required upstream artifact does not exist
    #[error("missing {artifact} at {}; run `{producer}` first", .path.display())]
    MissingInput {
        artifact: &'static str,
        path: PathBuf,
        producer: String,
    },

    /// A table lacks a column the stage cannot work without
    #[error("{table} table has no `{column}` column; regenerate it with `{producer}`")]
    MissingColumn {
        table: &'static str,
        column: String,
        producer: &'static str,
    },

    /// The training target is absent from the matchup table
    #[error("matchup table has no `{0}` target column; re-run `gridiron-edge build`")]
    MissingTarget(String),

    /// Too few graded games to train or validate
    #[error(
        "only {found} usable rows for `{target}` (need {required}); \
         add seasons with `gridiron-edge build --first-season <YEAR>`"
    )]
    InsufficientSamples {
        target: String,
        found: usize,
        required: usize,
    },

    /// The feature selection rule matched nothing
    #[error("feature selection produced no columns; check [features] in the config or re-run `gridiron-edge bridge`")]
    EmptyFeatureSet,

    /// The feature selection rule matched fewer columns than allowed
    #[error(
        "feature selection produced {found} columns (minimum {required}); \
         re-run `gridiron-edge bridge` with more source metrics"
    )]
    TooFewFeatures { found: usize, required: usize },

    /// A target or score column was configured as a model input
    #[error("`{0}` is an outcome column and cannot be a model input; remove it from [features].context_columns")]
    LeakageColumn(String),

    /// The same team-week appears twice in a feature table
    #[error("duplicate team-week {team} {season} week {week}; fix the upstream feature export and re-run `gridiron-edge bridge`")]
    DuplicateTeamWeek { season: i32, team: String, week: u32 },

    /// Every cross-validation fold collapsed to an empty validation slice
    #[error("no usable time-ordered validation folds for `{0}`; all rows share too few weeks")]
    NoValidationFolds(String),

    /// The frozen model features are not all present in the current table
    #[error(
        "feature drift for `{target}` model: missing {missing:?}; \
         re-run `gridiron-edge build` then `gridiron-edge train`"
    )]
    FeatureDrift { target: String, missing: Vec<String> },

    /// A model file holds the artifact of another target
    #[error(
        "{} holds the `{found}` model, expected `{expected}`; re-run `gridiron-edge train`",
        .path.display()
    )]
    WrongTarget {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// No games matched the requested season/week
    #[error("no games found for season {season} week {week}; re-run `gridiron-edge build --season {season}`")]
    NoGames { season: i32, week: u32 },

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// Columns of one table disagree in length or name
    #[error("malformed table: {0}")]
    Schema(String),

    /// A column had an unexpected storage type
    #[error("column `{column}` has unsupported type {data_type}")]
    UnsupportedColumn { column: String, data_type: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Result alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Build a missing-input error for `path` if it does not exist
    pub fn require_file(
        path: &std::path::Path,
        artifact: &'static str,
        producer: impl Into<String>,
    ) -> Result<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(PipelineError::MissingInput {
                artifact,
                path: path.to_path_buf(),
                producer: producer.into(),
            })
        }
    }
}
