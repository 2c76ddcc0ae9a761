//! Bridge command implementation

use crate::config::Config;
use crate::data::{read_frame, write_frame};
use crate::error::PipelineError;
use crate::features::{merge_sources, DataQuality};
use clap::Args;

const OFFENSE_FILE: &str = "offense_weekly.parquet";
const DEFENSE_FILE: &str = "defense_weekly.parquet";
const INJURY_FILE: &str = "injuries_summary.parquet";

#[derive(Args, Debug)]
pub struct BridgeArgs {
    /// NFL season of the export
    #[arg(long)]
    pub season: i32,

    /// Week directory to read (`week<N>` under the features directory)
    #[arg(long)]
    pub week: u32,
}

impl BridgeArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let dir = config.paths.week_source_dir(self.week);
        let producer = format!("the upstream weekly feature export for week {}", self.week);
        let offense_path = dir.join(OFFENSE_FILE);
        let defense_path = dir.join(DEFENSE_FILE);
        let injury_path = dir.join(INJURY_FILE);
        PipelineError::require_file(&offense_path, "offense export", producer.clone())?;
        PipelineError::require_file(&defense_path, "defense export", producer)?;

        let offense = read_frame(&offense_path)?;
        let defense = read_frame(&defense_path)?;
        tracing::info!(
            offense_rows = offense.num_rows(),
            defense_rows = defense.num_rows(),
            dir = ?dir,
            "Loaded weekly exports"
        );

        let injuries = if injury_path.exists() {
            Some(read_frame(&injury_path)?)
        } else {
            tracing::warn!(path = ?injury_path, "No injury summary; injury features omitted");
            None
        };

        let mut quality = DataQuality::default();
        let table = merge_sources(&offense, &defense, injuries.as_ref(), &mut quality)?;
        quality.report("bridge");

        let in_season = table.rows().iter().filter(|r| r.season == self.season).count();
        if in_season == 0 {
            tracing::warn!(
                season = self.season,
                rows = table.len(),
                "Export has no team-weeks for the requested season"
            );
        }

        let output = config.paths.team_week_file();
        write_frame(&output, &table.to_frame()?)?;
        tracing::info!(path = ?output, rows = table.len(), columns = table.columns().len(), "Wrote team-week table");

        println!("\nBridge complete: {} team-weeks, {} features", table.len(), table.columns().len());
        println!("  Output: {}", output.display());
        for (group, needle) in [("EPA", "epa"), ("Success rate", "success"), ("Rolling", "_l3"), ("Injury", "injur")] {
            let count = table.columns().iter().filter(|c| c.contains(needle)).count();
            println!("  {:<14} {}", format!("{}:", group), count);
        }
        println!("\nNext steps:");
        println!("  gridiron-edge build --season {}", self.season);
        println!("  gridiron-edge train");
        println!("  gridiron-edge predict --season {} --week {}", self.season, self.week + 1);
        Ok(())
    }
}
