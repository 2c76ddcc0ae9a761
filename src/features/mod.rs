//! Feature pipeline
//!
//! Turns per-team weekly statistics and the schedule into one symmetric
//! matchup row per game:
//! - `team_week`: unified team-week table and the offense/defense/injury merge
//! - `schedule`: schedule rows and the regular-season filter
//! - `matchup`: home/away join, delta features and outcome targets
//! - `selector`: the single column-selection rule shared by training and prediction

mod matchup;
mod schedule;
mod selector;
mod team_week;

pub use matchup::{Matchup, MatchupAssembler, MatchupTable, TARGET_COLUMNS};
pub use schedule::{schedule_from_frame, ScheduleEntry, SCHEDULE_COLUMNS};
pub use selector::{FeatureSelector, OUTCOME_COLUMNS};
pub use team_week::{merge_sources, TeamWeek, TeamWeekTable, ROLLING_RENAMES};

use crate::telemetry::{record_quality, QualityMetric};
use std::collections::BTreeMap;

/// Feature values by column name; `None` is a missing value
pub type FeatureMap = BTreeMap<String, Option<f64>>;

/// Counts of row-level issues recovered while assembling tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataQuality {
    /// Text cells in metric columns that did not parse as numbers
    pub coercion_failures: usize,
    /// Rows skipped because team, season or week was null
    pub rows_missing_keys: usize,
    /// Team-weeks given zero injuries because the summary had no value
    pub injury_fills: usize,
    /// Games without a home team-week match
    pub unmatched_home: usize,
    /// Games without an away team-week match
    pub unmatched_away: usize,
    /// Unmatched games removed because `keep_unmatched` is off
    pub dropped_unmatched: usize,
    /// Schedule rows outside the regular season
    pub non_regular_games: usize,
}

impl DataQuality {
    /// Games missing features on at least one side are counted once per side
    pub fn unmatched_games(&self) -> usize {
        self.unmatched_home + self.unmatched_away
    }

    /// Push the counts to the metrics recorder and the log
    pub fn report(&self, stage: &'static str) {
        record_quality(QualityMetric::CoercionFailure, self.coercion_failures);
        record_quality(QualityMetric::InjuryFill, self.injury_fills);
        record_quality(QualityMetric::UnmatchedGame, self.unmatched_games());

        if self.coercion_failures > 0 || self.rows_missing_keys > 0 {
            tracing::warn!(
                stage,
                coercion_failures = self.coercion_failures,
                rows_missing_keys = self.rows_missing_keys,
                "Non-numeric or keyless cells were treated as missing"
            );
        }
        if self.unmatched_games() > 0 {
            tracing::warn!(
                stage,
                unmatched_home = self.unmatched_home,
                unmatched_away = self.unmatched_away,
                dropped = self.dropped_unmatched,
                "Games without team-week features"
            );
        }
        tracing::info!(
            stage,
            injury_fills = self.injury_fills,
            non_regular_games = self.non_regular_games,
            "Data-quality summary"
        );
    }
}
