//! Status command implementation

use crate::config::Config;
use crate::data::read_frame;
use crate::error::PipelineError;
use crate::features::{schedule_from_frame, DataQuality, ScheduleEntry, TeamWeekTable};
use clap::Args;
use std::collections::BTreeMap;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// NFL season to inspect
    #[arg(long)]
    pub season: i32,
}

/// Game counts of one week
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekStatus {
    pub week: u32,
    pub total: usize,
    pub completed: usize,
    pub upcoming: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonStatus {
    pub weeks: Vec<WeekStatus>,
    pub last_week: Option<u32>,
    /// Latest week with at least one final score (0 before kickoff of the season)
    pub last_completed: u32,
}

impl SeasonStatus {
    pub fn recommended_week(&self) -> u32 {
        self.last_completed + 1
    }
}

/// Per-week progress of the regular season of `season`
pub fn season_status(games: &[ScheduleEntry], season: i32) -> SeasonStatus {
    let mut by_week: BTreeMap<u32, WeekStatus> = BTreeMap::new();
    for game in games
        .iter()
        .filter(|g| g.season == season && g.is_regular_season())
    {
        let entry = by_week.entry(game.week).or_insert(WeekStatus {
            week: game.week,
            total: 0,
            completed: 0,
            upcoming: 0,
        });
        entry.total += 1;
        if game.is_completed() {
            entry.completed += 1;
        } else {
            entry.upcoming += 1;
        }
    }

    let weeks: Vec<WeekStatus> = by_week.into_values().collect();
    SeasonStatus {
        last_week: weeks.last().map(|w| w.week),
        last_completed: weeks
            .iter()
            .filter(|w| w.completed > 0)
            .map(|w| w.week)
            .max()
            .unwrap_or(0),
        weeks,
    }
}

impl StatusArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let schedule_path = config.paths.schedule_file();
        PipelineError::require_file(&schedule_path, "schedule", "the upstream schedule ingest")?;
        let mut quality = DataQuality::default();
        let games = schedule_from_frame(&read_frame(&schedule_path)?, &mut quality)?;
        let status = season_status(&games, self.season);

        println!("\n{}", "═".repeat(44));
        println!("{} REGULAR SEASON", self.season);
        println!("{}", "─".repeat(44));
        println!("{:>6} {:>12} {:>12} {:>10}", "Week", "Total", "Completed", "Upcoming");
        for w in &status.weeks {
            println!("{:>6} {:>12} {:>12} {:>10}", w.week, w.total, w.completed, w.upcoming);
        }
        println!("{}", "═".repeat(44));

        let Some(last_week) = status.last_week else {
            println!("No regular-season games for {} in {}", self.season, schedule_path.display());
            return Ok(());
        };
        let recommended = status.recommended_week();
        println!("Last week in schedule:       {}", last_week);
        println!("Last completed week:         {}", status.last_completed);
        println!("Recommended prediction week: {}", recommended);

        let team_week_path = config.paths.team_week_file();
        if team_week_path.exists() {
            let team_weeks = TeamWeekTable::from_frame(&read_frame(&team_week_path)?, &mut quality)?;
            let teams = team_weeks.teams_for_week(self.season, recommended);
            let expected = team_weeks.teams_in(self.season).len();
            println!(
                "Teams with features for week {}: {}/{}",
                recommended, teams, expected
            );
            if teams < expected {
                println!(
                    "  Not every team has features yet; run `gridiron-edge bridge --season {} --week {}`",
                    self.season, recommended
                );
            }
        } else {
            println!(
                "No team-week table at {}; run `gridiron-edge bridge --season {} --week <WEEK>`",
                team_week_path.display(),
                self.season
            );
        }
        Ok(())
    }
}
