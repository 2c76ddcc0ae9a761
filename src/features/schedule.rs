//! Schedule rows

use super::DataQuality;
use crate::data::{ColumnData, Frame};
use crate::error::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

const PRODUCER: &str = "the upstream schedule ingest";

/// Schedule columns carried into the matchup table, in output order
pub const SCHEDULE_COLUMNS: [&str; 11] = [
    "game_id",
    "season",
    "week",
    "game_type",
    "kickoff",
    "home_team",
    "away_team",
    "home_score",
    "away_score",
    "spread_line",
    "total_line",
];

const REGULAR_SEASON_TYPES: [&str; 4] = ["REG", "REGULAR", "REGULAR_SEASON", ""];

/// One scheduled game
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub game_id: Option<String>,
    pub season: i32,
    pub week: u32,
    pub game_type: Option<String>,
    pub kickoff: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<f64>,
    pub away_score: Option<f64>,
    /// Market home margin (positive = home favored)
    pub spread_line: Option<f64>,
    pub total_line: Option<f64>,
}

impl ScheduleEntry {
    /// Regular-season game; a missing game type counts as regular
    pub fn is_regular_season(&self) -> bool {
        let game_type = self
            .game_type
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_uppercase();
        REGULAR_SEASON_TYPES.contains(&game_type.as_str())
    }

    /// Both final scores are known
    pub fn is_completed(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    /// Time-ordering key
    pub fn key(&self) -> (i32, u32) {
        (self.season, self.week)
    }
}

fn combine_kickoff(day: Option<&str>, time: Option<&str>) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(day?.trim(), "%Y-%m-%d").ok()?;
    let time = time
        .and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M").ok())
        .unwrap_or(NaiveTime::MIN);
    Some(NaiveDateTime::new(date, time).and_utc())
}

/// Decode schedule rows.
///
/// Kickoff comes from a `kickoff` timestamp column when present, otherwise from
/// `gameday` (`%Y-%m-%d`) and `gametime` (`%H:%M`) read as UTC.
pub fn schedule_from_frame(frame: &Frame, quality: &mut DataQuality) -> Result<Vec<ScheduleEntry>> {
    let seasons = frame.require_numeric("season", "schedule", PRODUCER)?;
    let weeks = frame.require_numeric("week", "schedule", PRODUCER)?;
    let homes = frame.require_text("home_team", "schedule", PRODUCER)?;
    let aways = frame.require_text("away_team", "schedule", PRODUCER)?;

    let n = frame.num_rows();
    let optional_numeric = |name: &str, quality: &mut DataQuality| -> Vec<Option<f64>> {
        match frame.numeric(name) {
            Some(c) => {
                quality.coercion_failures += c.failures;
                c.values
            }
            None => vec![None; n],
        }
    };
    let home_scores = optional_numeric("home_score", quality);
    let away_scores = optional_numeric("away_score", quality);
    let spreads = optional_numeric("spread_line", quality);
    let totals = optional_numeric("total_line", quality);
    quality.coercion_failures += seasons.failures + weeks.failures;

    let game_ids = frame.text("game_id").unwrap_or_else(|| vec![None; n]);
    let game_types = frame.text("game_type").unwrap_or_else(|| vec![None; n]);
    let kickoffs = match frame.timestamps("kickoff") {
        Some(k) => k,
        None => {
            let days = frame.text("gameday").unwrap_or_else(|| vec![None; n]);
            let times = frame.text("gametime").unwrap_or_else(|| vec![None; n]);
            days.iter()
                .zip(times.iter())
                .map(|(d, t)| combine_kickoff(d.as_deref(), t.as_deref()))
                .collect()
        }
    };

    let mut games = Vec::with_capacity(n);
    for i in 0..n {
        let (Some(season), Some(week), Some(home), Some(away)) = (
            seasons.values[i],
            weeks.values[i],
            homes[i].clone(),
            aways[i].clone(),
        ) else {
            quality.rows_missing_keys += 1;
            continue;
        };
        games.push(ScheduleEntry {
            game_id: game_ids[i].clone(),
            season: season as i32,
            week: week.max(0.0) as u32,
            game_type: game_types[i].clone(),
            kickoff: kickoffs[i],
            home_team: home,
            away_team: away,
            home_score: home_scores[i],
            away_score: away_scores[i],
            spread_line: spreads[i],
            total_line: totals[i],
        });
    }
    Ok(games)
}

fn text_column(games: &[ScheduleEntry], f: impl Fn(&ScheduleEntry) -> Option<String>) -> ColumnData {
    ColumnData::Text(games.iter().map(f).collect())
}

fn numeric_column(games: &[ScheduleEntry], f: impl Fn(&ScheduleEntry) -> Option<f64>) -> ColumnData {
    ColumnData::Numeric(games.iter().map(f).collect())
}

/// Encode games as the schedule columns of a frame
pub(crate) fn schedule_to_frame(games: &[ScheduleEntry]) -> Result<Frame> {
    Frame::new()
        .with_column("game_id", text_column(games, |g| g.game_id.clone()))?
        .with_column("season", numeric_column(games, |g| Some(g.season as f64)))?
        .with_column("week", numeric_column(games, |g| Some(g.week as f64)))?
        .with_column("game_type", text_column(games, |g| g.game_type.clone()))?
        .with_column(
            "kickoff",
            ColumnData::Timestamp(games.iter().map(|g| g.kickoff).collect()),
        )?
        .with_column("home_team", text_column(games, |g| Some(g.home_team.clone())))?
        .with_column("away_team", text_column(games, |g| Some(g.away_team.clone())))?
        .with_column("home_score", numeric_column(games, |g| g.home_score))?
        .with_column("away_score", numeric_column(games, |g| g.away_score))?
        .with_column("spread_line", numeric_column(games, |g| g.spread_line))?
        .with_column("total_line", numeric_column(games, |g| g.total_line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn game(game_type: Option<&str>) -> ScheduleEntry {
        ScheduleEntry {
            game_id: Some("2025_09_BUF_NE".to_string()),
            season: 2025,
            week: 9,
            game_type: game_type.map(str::to_string),
            kickoff: None,
            home_team: "NE".to_string(),
            away_team: "BUF".to_string(),
            home_score: None,
            away_score: None,
            spread_line: Some(-3.5),
            total_line: Some(44.5),
        }
    }

    #[test]
    fn test_regular_season_filter() {
        assert!(game(Some("REG")).is_regular_season());
        assert!(game(Some("regular")).is_regular_season());
        assert!(game(Some("Regular_Season")).is_regular_season());
        assert!(game(Some("")).is_regular_season());
        assert!(game(None).is_regular_season());
        assert!(!game(Some("WC")).is_regular_season());
        assert!(!game(Some("SB")).is_regular_season());
    }

    #[test]
    fn test_schedule_frame_round_trip() {
        let mut g = game(Some("REG"));
        g.kickoff = Some(Utc.with_ymd_and_hms(2025, 11, 2, 18, 0, 0).unwrap());
        g.home_score = Some(21.0);
        let frame = schedule_to_frame(&[g.clone()]).unwrap();
        let mut quality = DataQuality::default();
        let decoded = schedule_from_frame(&frame, &mut quality).unwrap();
        assert_eq!(decoded, vec![g]);
        assert_eq!(quality, DataQuality::default());
    }

    #[test]
    fn test_kickoff_from_gameday_and_gametime() {
        let frame = Frame::new()
            .with_column("season", ColumnData::Numeric(vec![Some(2025.0)]))
            .unwrap()
            .with_column("week", ColumnData::Numeric(vec![Some(9.0)]))
            .unwrap()
            .with_column("home_team", ColumnData::Text(vec![Some("NE".into())]))
            .unwrap()
            .with_column("away_team", ColumnData::Text(vec![Some("BUF".into())]))
            .unwrap()
            .with_column("gameday", ColumnData::Text(vec![Some("2025-11-02".into())]))
            .unwrap()
            .with_column("gametime", ColumnData::Text(vec![Some("13:00".into())]))
            .unwrap();
        let mut quality = DataQuality::default();
        let games = schedule_from_frame(&frame, &mut quality).unwrap();
        assert_eq!(
            games[0].kickoff,
            Some(Utc.with_ymd_and_hms(2025, 11, 2, 13, 0, 0).unwrap())
        );
        assert_eq!(games[0].home_score, None);
        assert!(!games[0].is_completed());
    }

    #[test]
    fn test_rows_without_keys_are_counted() {
        let frame = Frame::new()
            .with_column("season", ColumnData::Numeric(vec![Some(2025.0), None]))
            .unwrap()
            .with_column("week", ColumnData::Numeric(vec![Some(9.0), Some(9.0)]))
            .unwrap()
            .with_column("home_team", ColumnData::Text(vec![Some("NE".into()), Some("KC".into())]))
            .unwrap()
            .with_column("away_team", ColumnData::Text(vec![Some("BUF".into()), Some("LV".into())]))
            .unwrap();
        let mut quality = DataQuality::default();
        let games = schedule_from_frame(&frame, &mut quality).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(quality.rows_missing_keys, 1);
    }
}
