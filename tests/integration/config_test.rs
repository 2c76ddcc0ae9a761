//! Configuration file tests

use gridiron_edge::config::{Config, JoinPolicy, DEFAULT_DELTA_BASES, DEFAULT_MARGIN_SIGMA};
use gridiron_edge::error::PipelineError;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_example_matches_defaults() {
    let config = Config::from_toml(include_str!("../../gridiron.toml.example")).unwrap();
    let defaults = Config::default();

    assert_eq!(config.features.delta_bases, DEFAULT_DELTA_BASES.map(String::from).to_vec());
    assert_eq!(config.features.context_columns, defaults.features.context_columns);
    assert_eq!(config.features.min_features, defaults.features.min_features);
    assert_eq!(config.features.join, JoinPolicy::Exact);
    assert_eq!(config.training.n_estimators, defaults.training.n_estimators);
    assert_eq!(config.training.seed, 42);
    assert_eq!(config.prediction.margin_sigma, DEFAULT_MARGIN_SIGMA);
    assert_eq!(config.paths.data_dir, defaults.paths.data_dir);
}

#[test]
fn test_config_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gridiron.toml");
    fs::write(
        &path,
        r#"
        [features]
        join = "as_of"
        keep_unmatched = false

        [training]
        min_samples = 250
        "#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.features.join, JoinPolicy::AsOf);
    assert!(!config.features.keep_unmatched);
    assert_eq!(config.training.min_samples, 250);
    assert_eq!(config.training.max_folds, 5);
}

#[test]
fn test_config_malformed_is_fatal() {
    let result = Config::from_toml("[training\nmin_samples = ");
    assert!(matches!(result, Err(PipelineError::Toml(_))));
}

#[test]
fn test_config_unknown_join_policy() {
    let result = Config::from_toml("[features]\njoin = \"nearest\"\n");
    assert!(result.is_err());
}

#[test]
fn test_config_rejects_empty_whitelist() {
    let result = Config::from_toml("[features]\ndelta_bases = []\n");
    assert!(matches!(result, Err(PipelineError::Config(_))));
}
