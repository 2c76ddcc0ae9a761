//! Build command implementation

use crate::config::Config;
use crate::data::{read_frame, write_frame};
use crate::error::PipelineError;
use crate::features::{schedule_from_frame, DataQuality, MatchupAssembler, TeamWeekTable};
use clap::Args;

/// Null counts shown in the build report
const NULL_REPORT_LIMIT: usize = 10;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Last season to include
    #[arg(long)]
    pub season: i32,

    /// First season to include (defaults to --season)
    #[arg(long)]
    pub first_season: Option<i32>,
}

impl BuildArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let first = self.first_season.unwrap_or(self.season);
        if first > self.season {
            anyhow::bail!(
                "--first-season {} is after --season {}",
                first,
                self.season
            );
        }

        let schedule_path = config.paths.schedule_file();
        let team_week_path = config.paths.team_week_file();
        PipelineError::require_file(&schedule_path, "schedule", "the upstream schedule ingest")?;
        PipelineError::require_file(
            &team_week_path,
            "team-week features",
            format!("gridiron-edge bridge --season {} --week <WEEK>", self.season),
        )?;

        let mut quality = DataQuality::default();
        let schedule: Vec<_> = schedule_from_frame(&read_frame(&schedule_path)?, &mut quality)?
            .into_iter()
            .filter(|g| (first..=self.season).contains(&g.season))
            .collect();
        let team_weeks = TeamWeekTable::from_frame(&read_frame(&team_week_path)?, &mut quality)?;
        tracing::info!(
            games = schedule.len(),
            team_weeks = team_weeks.len(),
            first_season = first,
            last_season = self.season,
            "Loaded build inputs"
        );

        let assembler = MatchupAssembler::new(config.features.clone());
        let table = assembler.assemble(&schedule, &team_weeks, &mut quality);
        if table.is_empty() {
            anyhow::bail!(
                "no regular-season games for seasons {}..={} in {}; refresh the schedule ingest",
                first,
                self.season,
                schedule_path.display()
            );
        }

        quality.report("build");
        for (column, nulls) in table.null_counts().into_iter().take(NULL_REPORT_LIMIT) {
            tracing::info!(column, nulls, rows = table.len(), "Feature nulls");
        }
        for (season, team) in MatchupAssembler::unknown_teams(&schedule, &team_weeks) {
            tracing::warn!(season, team, "Schedule team has no team-week features; check team naming");
        }

        let output = config.paths.model_table_file();
        write_frame(&output, &table.to_frame()?)?;

        let graded = table.rows().iter().filter(|m| m.margin.is_some()).count();
        let deltas = table
            .feature_columns()
            .iter()
            .filter(|c| c.starts_with(&config.features.delta_prefix))
            .count();
        tracing::info!(path = ?output, rows = table.len(), graded, "Wrote matchup table");

        println!("\nModel table built: seasons {}..={}", first, self.season);
        println!("  Games:          {}", table.len());
        println!("  Graded:         {}", graded);
        println!("  Upcoming:       {}", table.len() - graded);
        println!("  Feature cols:   {} ({} deltas)", table.feature_columns().len(), deltas);
        println!("  Unmatched:      {} home / {} away", quality.unmatched_home, quality.unmatched_away);
        println!("  Output:         {}", output.display());
        Ok(())
    }
}
