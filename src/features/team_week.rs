//! Team-week feature table and the upstream source merge

use super::{DataQuality, FeatureMap};
use crate::config::JoinPolicy;
use crate::data::{ColumnData, Frame};
use crate::error::{PipelineError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};

const PRODUCER: &str = "gridiron-edge bridge --season <SEASON> --week <WEEK>";
const KEY_COLUMNS: [&str; 3] = ["team", "season", "week"];

/// Upstream rolling-window names and their canonical replacements
pub const ROLLING_RENAMES: [(&str, &str); 4] = [
    ("off_roll3_epa", "off_epa_l3"),
    ("off_roll3_success_rate", "off_sr_l3"),
    ("def_roll3_epa", "def_epa_l3"),
    ("def_roll3_success_rate", "def_sr_l3"),
];

/// Injury summary columns and their team-week names
const INJURY_COLUMNS: [(&str, &str); 3] = [
    ("injury_impact_score", "injury_impact"),
    ("qb_injuries", "qb_out"),
    ("out_count", "players_out"),
];

/// One team's statistics entering a given week
#[derive(Debug, Clone, PartialEq)]
pub struct TeamWeek {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub features: FeatureMap,
}

impl TeamWeek {
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied().flatten()
    }
}

/// All team-weeks, at most one per (season, team, week)
#[derive(Debug, Clone)]
pub struct TeamWeekTable {
    columns: Vec<String>,
    rows: Vec<TeamWeek>,
    /// (season, team) -> (week, row index), ascending by week
    index: HashMap<(i32, String), Vec<(u32, usize)>>,
}

impl TeamWeekTable {
    /// Build a table; a repeated (season, team, week) is fatal
    pub fn new(columns: Vec<String>, rows: Vec<TeamWeek>) -> Result<Self> {
        let mut index: HashMap<(i32, String), Vec<(u32, usize)>> = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            let weeks = index.entry((row.season, row.team.clone())).or_default();
            if weeks.iter().any(|(w, _)| *w == row.week) {
                return Err(PipelineError::DuplicateTeamWeek {
                    season: row.season,
                    team: row.team.clone(),
                    week: row.week,
                });
            }
            weeks.push((row.week, i));
        }
        for weeks in index.values_mut() {
            weeks.sort_unstable();
        }
        Ok(Self {
            columns,
            rows,
            index,
        })
    }

    /// Feature column names (join keys excluded)
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TeamWeek] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Features for `team` entering `week`; never returns a later week
    pub fn lookup(&self, season: i32, team: &str, week: u32, policy: JoinPolicy) -> Option<&TeamWeek> {
        let weeks = self.index.get(&(season, team.to_string()))?;
        let found = match policy {
            JoinPolicy::Exact => weeks.iter().find(|(w, _)| *w == week),
            JoinPolicy::AsOf => weeks.iter().rev().find(|(w, _)| *w <= week),
        };
        found.map(|(_, i)| &self.rows[*i])
    }

    /// Team names with at least one record in `season`
    pub fn teams_in(&self, season: i32) -> BTreeSet<&str> {
        self.rows
            .iter()
            .filter(|r| r.season == season)
            .map(|r| r.team.as_str())
            .collect()
    }

    /// Teams with a record for exactly (season, week)
    pub fn teams_for_week(&self, season: i32, week: u32) -> usize {
        self.rows
            .iter()
            .filter(|r| r.season == season && r.week == week)
            .count()
    }

    /// Decode a stored team-week table
    pub fn from_frame(frame: &Frame, quality: &mut DataQuality) -> Result<Self> {
        let teams = frame.require_text("team", "team-week", PRODUCER)?;
        let seasons = frame.require_numeric("season", "team-week", PRODUCER)?;
        let weeks = frame.require_numeric("week", "team-week", PRODUCER)?;
        quality.coercion_failures += seasons.failures + weeks.failures;

        let columns: Vec<String> = frame
            .column_names()
            .filter(|name| !KEY_COLUMNS.contains(name))
            .map(str::to_string)
            .collect();
        let mut values = Vec::with_capacity(columns.len());
        for name in &columns {
            let coerced = frame
                .numeric(name)
                .ok_or_else(|| PipelineError::Schema(format!("column `{}` vanished", name)))?;
            quality.coercion_failures += coerced.failures;
            values.push(coerced.values);
        }

        let mut rows = Vec::with_capacity(frame.num_rows());
        for i in 0..frame.num_rows() {
            let (Some(team), Some(season), Some(week)) =
                (teams[i].clone(), seasons.values[i], weeks.values[i])
            else {
                quality.rows_missing_keys += 1;
                continue;
            };
            let features = columns
                .iter()
                .zip(values.iter())
                .map(|(name, col)| (name.clone(), col[i]))
                .collect();
            rows.push(TeamWeek {
                season: season as i32,
                week: week.max(0.0) as u32,
                team,
                features,
            });
        }

        Self::new(columns, rows)
    }

    /// Encode as team, season, week followed by the feature columns
    pub fn to_frame(&self) -> Result<Frame> {
        let mut frame = Frame::new()
            .with_column(
                "team",
                ColumnData::Text(self.rows.iter().map(|r| Some(r.team.clone())).collect()),
            )?
            .with_column(
                "season",
                ColumnData::Numeric(self.rows.iter().map(|r| Some(r.season as f64)).collect()),
            )?
            .with_column(
                "week",
                ColumnData::Numeric(self.rows.iter().map(|r| Some(r.week as f64)).collect()),
            )?;
        for name in &self.columns {
            frame.push_column(
                name.clone(),
                ColumnData::Numeric(self.rows.iter().map(|r| r.feature(name)).collect()),
            )?;
        }
        Ok(frame)
    }
}

type SideKey = (i32, u32, String);

/// One upstream source keyed by (season, week, team) with prefixed columns
struct SideTable {
    columns: Vec<String>,
    rows: BTreeMap<SideKey, Vec<Option<f64>>>,
}

fn load_side(
    frame: &Frame,
    team_column: &str,
    prefix: &str,
    source: &'static str,
    quality: &mut DataQuality,
) -> Result<SideTable> {
    let team_column = if frame.has_column(team_column) {
        team_column
    } else {
        "team"
    };
    let teams = frame.require_text(team_column, source, "the upstream weekly feature export")?;
    let seasons = frame.require_numeric("season", source, "the upstream weekly feature export")?;
    let weeks = frame.require_numeric("week", source, "the upstream weekly feature export")?;
    quality.coercion_failures += seasons.failures + weeks.failures;

    let raw: Vec<&str> = frame
        .column_names()
        .filter(|name| *name != team_column && !KEY_COLUMNS.contains(name))
        .collect();
    let columns = raw.iter().map(|name| format!("{}{}", prefix, name)).collect();

    let mut values = Vec::with_capacity(raw.len());
    for name in &raw {
        if let Some(coerced) = frame.numeric(name) {
            quality.coercion_failures += coerced.failures;
            values.push(coerced.values);
        }
    }

    let mut rows = BTreeMap::new();
    for i in 0..frame.num_rows() {
        let (Some(team), Some(season), Some(week)) =
            (teams[i].clone(), seasons.values[i], weeks.values[i])
        else {
            quality.rows_missing_keys += 1;
            continue;
        };
        let key = (season as i32, week.max(0.0) as u32, team);
        let row = values.iter().map(|col| col[i]).collect();
        if rows.insert(key.clone(), row).is_some() {
            return Err(PipelineError::DuplicateTeamWeek {
                season: key.0,
                team: key.2,
                week: key.1,
            });
        }
    }

    Ok(SideTable { columns, rows })
}

fn canonical_name(name: String) -> String {
    ROLLING_RENAMES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| to.to_string())
        .unwrap_or(name)
}

/// Unify upstream offense and defense exports into one team-week table.
///
/// Offense and defense are full-outer-joined on (season, team, week), so a
/// team-week seen in either source appears exactly once. The optional injury
/// summary is left-joined; a team-week it does not mention has no injuries.
pub fn merge_sources(
    offense: &Frame,
    defense: &Frame,
    injuries: Option<&Frame>,
    quality: &mut DataQuality,
) -> Result<TeamWeekTable> {
    let offense = load_side(offense, "offense_team", "off_", "offense", quality)?;
    let defense = load_side(defense, "defense_team", "def_", "defense", quality)?;

    let keys: BTreeSet<&SideKey> = offense.rows.keys().chain(defense.rows.keys()).collect();

    let injury_lookup = injuries
        .map(|frame| load_injuries(frame, quality))
        .transpose()?;

    let mut columns: Vec<String> = offense
        .columns
        .iter()
        .chain(defense.columns.iter())
        .cloned()
        .map(canonical_name)
        .collect();
    if injury_lookup.is_some() {
        columns.extend(INJURY_COLUMNS.iter().map(|(_, to)| to.to_string()));
    }

    let mut rows = Vec::with_capacity(keys.len());
    for key in keys {
        let mut features = FeatureMap::new();
        for side in [&offense, &defense] {
            let values = side.rows.get(key);
            for (j, name) in side.columns.iter().enumerate() {
                let value = values.and_then(|v| v[j]);
                features.insert(canonical_name(name.clone()), value);
            }
        }

        if let Some(lookup) = &injury_lookup {
            let (season, week, team) = key;
            let found = lookup
                .get(&(Some(*season), *week, team.clone()))
                .or_else(|| lookup.get(&(None, *week, team.clone())));
            for (j, (_, to)) in INJURY_COLUMNS.iter().enumerate() {
                let value = found.and_then(|v| v[j]);
                if value.is_none() {
                    quality.injury_fills += 1;
                }
                features.insert(to.to_string(), Some(value.unwrap_or(0.0)));
            }
        }

        rows.push(TeamWeek {
            season: key.0,
            week: key.1,
            team: key.2.clone(),
            features,
        });
    }

    TeamWeekTable::new(columns, rows)
}

type InjuryKey = (Option<i32>, u32, String);

/// Injury summary keyed by (season if present, week, team)
fn load_injuries(
    frame: &Frame,
    quality: &mut DataQuality,
) -> Result<HashMap<InjuryKey, Vec<Option<f64>>>> {
    const SOURCE: &str = "injury summary";
    const PRODUCER_INJ: &str = "the upstream injury summary export";

    let teams = frame.require_text("team", SOURCE, PRODUCER_INJ)?;
    let weeks = frame.require_numeric("week", SOURCE, PRODUCER_INJ)?;
    let seasons = frame.numeric("season");

    let mut values = Vec::with_capacity(INJURY_COLUMNS.len());
    for (from, _) in INJURY_COLUMNS {
        let coerced = frame.require_numeric(from, SOURCE, PRODUCER_INJ)?;
        quality.coercion_failures += coerced.failures;
        values.push(coerced.values);
    }

    let mut lookup = HashMap::new();
    for i in 0..frame.num_rows() {
        let (Some(team), Some(week)) = (teams[i].clone(), weeks.values[i]) else {
            quality.rows_missing_keys += 1;
            continue;
        };
        let season = seasons
            .as_ref()
            .and_then(|s| s.values[i])
            .map(|s| s as i32);
        let key = (season, week.max(0.0) as u32, team);
        let row = values.iter().map(|col| col[i]).collect();
        if lookup.insert(key.clone(), row).is_some() {
            let (season, week, team) = key;
            return Err(match season {
                Some(season) => PipelineError::DuplicateTeamWeek { season, team, week },
                None => PipelineError::Schema(format!(
                    "injury summary has more than one row for {} week {}",
                    team, week
                )),
            });
        }
    }
    Ok(lookup)
}
