//! Matchup assembly: schedule ⟕ home features ⟕ away features
//!
//! Every team-week column `c` becomes `home_c` and `away_c`. For each
//! whitelisted base name `b` the delta column is `home_b - away_b`, null when
//! either side is null. Targets are only graded when both scores are known.

use super::schedule::schedule_to_frame;
use super::{schedule_from_frame, DataQuality, FeatureMap, ScheduleEntry, TeamWeekTable};
use super::SCHEDULE_COLUMNS;
use crate::config::FeaturesConfig;
use crate::data::{ColumnData, Frame};
use crate::error::Result;

const PRODUCER: &str = "gridiron-edge build --season <SEASON>";

/// Outcome columns derived from final scores
pub const TARGET_COLUMNS: [&str; 2] = ["margin", "total_points"];

/// One game with both teams' features
#[derive(Debug, Clone, PartialEq)]
pub struct Matchup {
    pub game: ScheduleEntry,
    pub features: FeatureMap,
    /// home_score - away_score
    pub margin: Option<f64>,
    /// home_score + away_score
    pub total_points: Option<f64>,
}

impl Matchup {
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied().flatten()
    }

    /// Values of `names`, in that order
    pub fn values(&self, names: &[String]) -> Vec<Option<f64>> {
        names.iter().map(|n| self.feature(n)).collect()
    }

    /// Value of a target column by name
    pub fn target(&self, column: &str) -> Option<f64> {
        match column {
            "margin" => self.margin,
            "total_points" => self.total_points,
            _ => None,
        }
    }
}

/// Grade a game: both targets or neither
pub fn targets(home_score: Option<f64>, away_score: Option<f64>) -> (Option<f64>, Option<f64>) {
    match (home_score, away_score) {
        (Some(h), Some(a)) => (Some(h - a), Some(h + a)),
        _ => (None, None),
    }
}

/// Matchup rows plus their column layout
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupTable {
    feature_columns: Vec<String>,
    has_targets: bool,
    rows: Vec<Matchup>,
}

impl MatchupTable {
    pub fn new(feature_columns: Vec<String>, rows: Vec<Matchup>) -> Self {
        Self {
            feature_columns,
            has_targets: true,
            rows,
        }
    }

    pub fn rows(&self) -> &[Matchup] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Matchup> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Every column name of the stored table
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = SCHEDULE_COLUMNS.to_vec();
        columns.extend(self.feature_columns.iter().map(String::as_str));
        if self.has_targets {
            columns.extend(TARGET_COLUMNS);
        }
        columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns().contains(&name)
    }

    /// Rows of one season and week, in table order
    pub fn week(&self, season: i32, week: u32) -> Vec<&Matchup> {
        self.rows
            .iter()
            .filter(|m| m.game.season == season && m.game.week == week)
            .collect()
    }

    /// Null count per feature column, largest first
    pub fn null_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = self
            .feature_columns
            .iter()
            .map(|c| {
                let nulls = self.rows.iter().filter(|m| m.feature(c).is_none()).count();
                (c.as_str(), nulls)
            })
            .filter(|(_, n)| *n > 0)
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts
    }

    pub fn to_frame(&self) -> Result<Frame> {
        let games: Vec<ScheduleEntry> = self.rows.iter().map(|m| m.game.clone()).collect();
        let mut frame = schedule_to_frame(&games)?;
        for name in &self.feature_columns {
            frame.push_column(
                name.clone(),
                ColumnData::Numeric(self.rows.iter().map(|m| m.feature(name)).collect()),
            )?;
        }
        if self.has_targets {
            frame.push_column(
                "margin",
                ColumnData::Numeric(self.rows.iter().map(|m| m.margin).collect()),
            )?;
            frame.push_column(
                "total_points",
                ColumnData::Numeric(self.rows.iter().map(|m| m.total_points).collect()),
            )?;
        }
        Ok(frame)
    }

    /// Decode a stored matchup table; a table may legitimately lack targets
    pub fn from_frame(frame: &Frame, quality: &mut DataQuality) -> Result<Self> {
        let games = schedule_from_frame(frame, quality)?;

        let feature_columns: Vec<String> = frame
            .column_names()
            .filter(|c| !SCHEDULE_COLUMNS.contains(c) && !TARGET_COLUMNS.contains(c))
            .filter(|c| !matches!(*c, "gameday" | "gametime"))
            .map(str::to_string)
            .collect();

        let mut values = Vec::with_capacity(feature_columns.len());
        for name in &feature_columns {
            let coerced = frame.require_numeric(name, "matchup", PRODUCER)?;
            quality.coercion_failures += coerced.failures;
            values.push(coerced.values);
        }

        let has_targets = TARGET_COLUMNS.iter().all(|c| frame.has_column(c));
        let margins = frame.numeric("margin").map(|c| c.values);
        let totals = frame.numeric("total_points").map(|c| c.values);

        // schedule_from_frame skips keyless rows; re-align on the keyed ones
        let keyed = keyed_rows(frame);

        let rows = games
            .into_iter()
            .zip(keyed)
            .map(|(game, i)| {
                let features = feature_columns
                    .iter()
                    .zip(values.iter())
                    .map(|(name, col)| (name.clone(), col[i]))
                    .collect();
                Matchup {
                    game,
                    features,
                    margin: margins.as_ref().and_then(|m| m[i]),
                    total_points: totals.as_ref().and_then(|t| t[i]),
                }
            })
            .collect();

        Ok(Self {
            feature_columns,
            has_targets,
            rows,
        })
    }
}

fn keyed_rows(frame: &Frame) -> Vec<usize> {
    let n = frame.num_rows();
    let numeric = |name: &str| frame.numeric(name).map(|c| c.values).unwrap_or_else(|| vec![None; n]);
    let text = |name: &str| frame.text(name).unwrap_or_else(|| vec![None; n]);
    let (seasons, weeks) = (numeric("season"), numeric("week"));
    let (homes, aways) = (text("home_team"), text("away_team"));
    (0..n)
        .filter(|&i| {
            seasons[i].is_some() && weeks[i].is_some() && homes[i].is_some() && aways[i].is_some()
        })
        .collect()
}

/// Joins schedule entries with team-week features
pub struct MatchupAssembler {
    config: FeaturesConfig,
}

impl MatchupAssembler {
    pub fn new(config: FeaturesConfig) -> Self {
        Self { config }
    }

    /// Name of the delta column for a base feature
    pub fn delta_column(&self, base: &str) -> String {
        format!("{}{}", self.config.delta_prefix, base)
    }

    /// Delta bases available in `team_weeks`, in whitelist order
    fn delta_bases<'a>(&'a self, team_weeks: &TeamWeekTable) -> Vec<&'a str> {
        self.config
            .delta_bases
            .iter()
            .filter(|b| team_weeks.columns().iter().any(|c| c == *b))
            .map(String::as_str)
            .collect()
    }

    /// Column layout produced for `team_weeks`
    pub fn feature_columns(&self, team_weeks: &TeamWeekTable) -> Vec<String> {
        let mut columns: Vec<String> = team_weeks
            .columns()
            .iter()
            .map(|c| format!("home_{}", c))
            .collect();
        columns.extend(team_weeks.columns().iter().map(|c| format!("away_{}", c)));
        columns.extend(
            self.delta_bases(team_weeks)
                .into_iter()
                .map(|b| self.delta_column(b)),
        );
        columns
    }

    /// Build one matchup; unmatched sides propagate as nulls
    pub fn assemble_game(&self, game: &ScheduleEntry, team_weeks: &TeamWeekTable) -> Matchup {
        let policy = self.config.join;
        let home = team_weeks.lookup(game.season, &game.home_team, game.week, policy);
        let away = team_weeks.lookup(game.season, &game.away_team, game.week, policy);

        let mut features = FeatureMap::new();
        for column in team_weeks.columns() {
            features.insert(
                format!("home_{}", column),
                home.and_then(|r| r.feature(column)),
            );
            features.insert(
                format!("away_{}", column),
                away.and_then(|r| r.feature(column)),
            );
        }
        for base in self.delta_bases(team_weeks) {
            let delta = match (
                home.and_then(|r| r.feature(base)),
                away.and_then(|r| r.feature(base)),
            ) {
                (Some(h), Some(a)) => Some(h - a),
                _ => None,
            };
            features.insert(self.delta_column(base), delta);
        }

        let (margin, total_points) = targets(game.home_score, game.away_score);
        Matchup {
            game: game.clone(),
            features,
            margin,
            total_points,
        }
    }

    /// Assemble every regular-season game in schedule order
    pub fn assemble(
        &self,
        schedule: &[ScheduleEntry],
        team_weeks: &TeamWeekTable,
        quality: &mut DataQuality,
    ) -> MatchupTable {
        let policy = self.config.join;
        let mut rows = Vec::with_capacity(schedule.len());

        for game in schedule {
            if !game.is_regular_season() {
                quality.non_regular_games += 1;
                continue;
            }

            let home_found = team_weeks
                .lookup(game.season, &game.home_team, game.week, policy)
                .is_some();
            let away_found = team_weeks
                .lookup(game.season, &game.away_team, game.week, policy)
                .is_some();
            if !home_found {
                quality.unmatched_home += 1;
            }
            if !away_found {
                quality.unmatched_away += 1;
            }
            if !(home_found && away_found) && !self.config.keep_unmatched {
                quality.dropped_unmatched += 1;
                tracing::debug!(
                    season = game.season,
                    week = game.week,
                    home = %game.home_team,
                    away = %game.away_team,
                    "Dropping game without team-week features"
                );
                continue;
            }

            rows.push(self.assemble_game(game, team_weeks));
        }

        MatchupTable::new(self.feature_columns(team_weeks), rows)
    }

    /// Schedule team names with no team-week record in that season
    pub fn unknown_teams<'a>(
        schedule: &'a [ScheduleEntry],
        team_weeks: &TeamWeekTable,
    ) -> Vec<(i32, &'a str)> {
        let mut unknown: Vec<(i32, &str)> = schedule
            .iter()
            .flat_map(|g| {
                [
                    (g.season, g.home_team.as_str()),
                    (g.season, g.away_team.as_str()),
                ]
            })
            .filter(|(season, team)| !team_weeks.teams_in(*season).contains(team))
            .collect();
        unknown.sort_unstable();
        unknown.dedup();
        unknown
    }
}
