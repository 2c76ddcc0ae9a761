//! Scoring of upcoming games
//!
//! Inputs are reindexed to each model's frozen feature list. A frozen feature
//! missing from the table is fatal; a missing cell is replaced by zero and
//! counted per row.
//!
//! Two line conventions appear in one record. `spread_line` and `edge_spread`
//! use home margin (positive when home is favoured), while `model_home_spread`
//! uses sportsbook notation (negative when home is favoured). So
//! `edge_spread == -model_home_spread - spread_line`.

use super::win_prob::win_probability;
use crate::config::{Config, PredictionConfig};
use crate::data::{ColumnData, Frame};
use crate::error::{PipelineError, Result};
use crate::features::{FeatureSelector, Matchup, MatchupTable};
use crate::model::{FittedModel, GbmEnsemble, Target, TrainedModel};
use crate::telemetry::{record_quality, QualityMetric};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// One scored game
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub season: i32,
    pub week: u32,
    pub game_id: Option<String>,
    pub kickoff: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub predicted_margin: f64,
    pub predicted_total: f64,
    pub home_win_prob: f64,
    pub predicted_home_score: f64,
    pub predicted_away_score: f64,
    /// Sportsbook notation: negative when the home team is favoured
    pub model_home_spread: f64,
    pub home_score: Option<f64>,
    pub away_score: Option<f64>,
    /// Market home margin, positive when the home team is favoured
    pub spread_line: Option<f64>,
    pub total_line: Option<f64>,
    /// predicted_margin - spread_line (home-margin convention, not sportsbook
    /// notation); positive when the model likes home more than the market
    pub edge_spread: Option<f64>,
    /// predicted_total - total_line
    pub edge_total: Option<f64>,
    /// Model inputs of this game that were missing and replaced by zero
    pub zero_filled: usize,
}

impl PredictionRecord {
    /// Team the model expects to win and by how much
    pub fn favourite(&self) -> (&str, f64) {
        if self.predicted_margin >= 0.0 {
            (&self.home_team, self.predicted_margin)
        } else {
            (&self.away_team, -self.predicted_margin)
        }
    }

    /// Absolute spread edge at or above `threshold`
    pub fn is_alert(&self, threshold: f64) -> bool {
        self.edge_spread.is_some_and(|e| e.abs() >= threshold)
    }
}

/// Margin and total models applied together
pub struct Predictor<M = GbmEnsemble> {
    margin: TrainedModel<M>,
    total: TrainedModel<M>,
    selector: FeatureSelector,
    config: PredictionConfig,
}

impl Predictor<GbmEnsemble> {
    /// Load both persisted models
    pub fn load(config: &Config) -> Result<Self> {
        let margin = TrainedModel::load_target(&config.paths.model_file(Target::Margin), Target::Margin)?;
        let total = TrainedModel::load_target(&config.paths.model_file(Target::Total), Target::Total)?;
        Ok(Self::new(margin, total, config))
    }
}

impl<M: FittedModel> Predictor<M> {
    pub fn new(margin: TrainedModel<M>, total: TrainedModel<M>, config: &Config) -> Self {
        Self {
            margin,
            total,
            selector: FeatureSelector::from_config(&config.features),
            config: config.prediction.clone(),
        }
    }

    fn models(&self) -> [&TrainedModel<M>; 2] {
        [&self.margin, &self.total]
    }

    /// Fail when a frozen feature is absent; warn about newly selectable ones
    pub fn check_features(&self, table: &MatchupTable) -> Result<()> {
        let columns = table.columns();
        for model in self.models() {
            let missing: Vec<String> = model
                .feature_names
                .iter()
                .filter(|f| !columns.contains(&f.as_str()))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(PipelineError::FeatureDrift {
                    target: model.target.name().to_string(),
                    missing,
                });
            }
        }

        let current = self.selector.select(&columns)?;
        for model in self.models() {
            let extra: Vec<&str> = current
                .iter()
                .filter(|c| !model.feature_names.contains(c))
                .map(String::as_str)
                .collect();
            if !extra.is_empty() {
                tracing::warn!(
                    target = %model.target,
                    extra = ?extra,
                    "Ignoring selectable features the model was not trained on; retrain to use them"
                );
            }
        }
        Ok(())
    }

    /// Score every game of `season`/`week`
    pub fn predict_week(
        &self,
        table: &MatchupTable,
        season: i32,
        week: u32,
    ) -> Result<Vec<PredictionRecord>> {
        let games: Vec<&Matchup> = table
            .week(season, week)
            .into_iter()
            .filter(|m| m.game.is_regular_season())
            .collect();
        if games.is_empty() {
            return Err(PipelineError::NoGames { season, week });
        }
        self.check_features(table)?;

        let mut records: Vec<PredictionRecord> = games.iter().map(|m| self.score(m)).collect();
        if self.config.sort_by_kickoff {
            // unknown kickoffs last
            records.sort_by_key(|r| (r.kickoff.is_none(), r.kickoff));
        }

        let zero_filled: usize = records.iter().map(|r| r.zero_filled).sum();
        if zero_filled > 0 {
            let rows = records.iter().filter(|r| r.zero_filled > 0).count();
            tracing::warn!(
                season,
                week,
                cells = zero_filled,
                games = rows,
                "Missing model inputs replaced by zero; those predictions are lower confidence"
            );
            record_quality(QualityMetric::PredictionZeroFill, zero_filled);
        }
        tracing::info!(season, week, games = records.len(), "Scored games");
        Ok(records)
    }

    /// Score one game
    pub fn score(&self, game: &Matchup) -> PredictionRecord {
        let mut missing: BTreeSet<String> = BTreeSet::new();
        let mut inputs = |model: &TrainedModel<M>| -> Vec<f64> {
            model
                .feature_names
                .iter()
                .map(|name| match game.feature(name).filter(|v| v.is_finite()) {
                    Some(v) => v,
                    None => {
                        missing.insert(name.clone());
                        0.0
                    }
                })
                .collect()
        };
        let margin_row = inputs(&self.margin);
        let total_row = inputs(&self.total);

        let predicted_margin = self.margin.predict_row(&margin_row);
        let predicted_total = self.total.predict_row(&total_row);
        let g = &game.game;

        PredictionRecord {
            season: g.season,
            week: g.week,
            game_id: g.game_id.clone(),
            kickoff: g.kickoff,
            home_team: g.home_team.clone(),
            away_team: g.away_team.clone(),
            predicted_margin,
            predicted_total,
            home_win_prob: win_probability(predicted_margin, self.config.margin_sigma),
            predicted_home_score: (predicted_total + predicted_margin) / 2.0,
            predicted_away_score: (predicted_total - predicted_margin) / 2.0,
            model_home_spread: -predicted_margin,
            home_score: g.home_score,
            away_score: g.away_score,
            spread_line: g.spread_line,
            total_line: g.total_line,
            edge_spread: g.spread_line.map(|line| predicted_margin - line),
            edge_total: g.total_line.map(|line| predicted_total - line),
            zero_filled: missing.len(),
        }
    }
}

/// Tabular form of the predictions
pub fn predictions_to_frame(records: &[PredictionRecord]) -> Result<Frame> {
    let numeric = |f: fn(&PredictionRecord) -> Option<f64>| {
        ColumnData::Numeric(records.iter().map(f).collect())
    };
    let text = |f: fn(&PredictionRecord) -> Option<String>| {
        ColumnData::Text(records.iter().map(f).collect())
    };

    Frame::new()
        .with_column("season", numeric(|r| Some(r.season as f64)))?
        .with_column("week", numeric(|r| Some(r.week as f64)))?
        .with_column("game_id", text(|r| r.game_id.clone()))?
        .with_column(
            "kickoff",
            ColumnData::Timestamp(records.iter().map(|r| r.kickoff).collect()),
        )?
        .with_column("home_team", text(|r| Some(r.home_team.clone())))?
        .with_column("away_team", text(|r| Some(r.away_team.clone())))?
        .with_column("predicted_margin", numeric(|r| Some(r.predicted_margin)))?
        .with_column("predicted_total", numeric(|r| Some(r.predicted_total)))?
        .with_column("home_win_prob", numeric(|r| Some(r.home_win_prob)))?
        .with_column("predicted_home_score", numeric(|r| Some(r.predicted_home_score)))?
        .with_column("predicted_away_score", numeric(|r| Some(r.predicted_away_score)))?
        .with_column("model_home_spread", numeric(|r| Some(r.model_home_spread)))?
        .with_column("home_score", numeric(|r| r.home_score))?
        .with_column("away_score", numeric(|r| r.away_score))?
        .with_column("spread_line", numeric(|r| r.spread_line))?
        .with_column("total_line", numeric(|r| r.total_line))?
        .with_column("edge_spread", numeric(|r| r.edge_spread))?
        .with_column("edge_total", numeric(|r| r.edge_total))?
        .with_column("zero_filled", numeric(|r| Some(r.zero_filled as f64)))
}
