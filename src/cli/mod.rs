//! CLI interface for gridiron-edge
//!
//! Provides subcommands for:
//! - `bridge`: Merge upstream weekly exports into the team-week table
//! - `build`: Assemble the matchup (model) table
//! - `train`: Fit and cross-validate the margin and total models
//! - `predict`: Score one week's games
//! - `status`: Show which weeks are played and which to predict next
//! - `config`: Show the effective configuration

mod bridge;
mod build;
mod predict;
mod status;
mod train;

pub use bridge::BridgeArgs;
pub use build::BuildArgs;
pub use predict::PredictArgs;
pub use status::{season_status, SeasonStatus, StatusArgs, WeekStatus};
pub use train::{importance_frame, TrainArgs};

use crate::config::Config;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gridiron-edge")]
#[command(about = "NFL matchup features, time-ordered model training and weekly predictions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "gridiron.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge a week's offense/defense/injury exports into the team-week table
    Bridge(BridgeArgs),
    /// Build the matchup table from the schedule and team-week features
    Build(BuildArgs),
    /// Train the margin and total models
    Train(TrainArgs),
    /// Predict one week's games
    Predict(PredictArgs),
    /// Show season progress and the recommended prediction week
    Status(StatusArgs),
    /// Show the effective configuration
    Config,
}

/// Print the effective configuration
pub fn show_config(config: &Config) {
    println!("Current configuration:");
    println!(
        "  Paths: data={} models={} reports={}",
        config.paths.data_dir.display(),
        config.paths.model_dir.display(),
        config.paths.reports_dir.display()
    );
    println!(
        "  Features: {} delta bases, prefix {:?}, context {:?}, min {}, join {:?}, keep_unmatched={}",
        config.features.delta_bases.len(),
        config.features.delta_prefix,
        config.features.context_columns,
        config.features.min_features,
        config.features.join,
        config.features.keep_unmatched
    );
    let t = &config.training;
    println!(
        "  Training: min_samples={} folds={}..={} trees={} depth={} lr={} subsample={} colsample={} lambda={} seed={}",
        t.min_samples,
        t.min_folds,
        t.max_folds,
        t.n_estimators,
        t.max_depth,
        t.learning_rate,
        t.subsample,
        t.colsample,
        t.lambda,
        t.seed
    );
    println!(
        "  Prediction: sigma={} edge_alert={} sort_by_kickoff={}",
        config.prediction.margin_sigma,
        config.prediction.edge_alert_points,
        config.prediction.sort_by_kickoff
    );
    println!(
        "  Telemetry: level={} json={}",
        config.telemetry.log_level, config.telemetry.json_logs
    );
}
