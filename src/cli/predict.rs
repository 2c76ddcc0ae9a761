//! Predict command implementation

use crate::config::Config;
use crate::data::{read_frame, write_frame};
use crate::error::PipelineError;
use crate::features::{DataQuality, MatchupTable};
use crate::predict::{format_predictions, predictions_to_frame, Predictor};
use clap::Args;

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// NFL season
    #[arg(long)]
    pub season: i32,

    /// Week to predict
    #[arg(long)]
    pub week: u32,
}

impl PredictArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let table_path = config.paths.model_table_file();
        PipelineError::require_file(
            &table_path,
            "matchup table",
            format!("gridiron-edge build --season {}", self.season),
        )?;
        let predictor = Predictor::load(config)?;

        let mut quality = DataQuality::default();
        let table = MatchupTable::from_frame(&read_frame(&table_path)?, &mut quality)?;
        quality.report("predict");

        let records = predictor.predict_week(&table, self.season, self.week)?;

        let output = config.paths.predictions_file(self.season, self.week);
        write_frame(&output, &predictions_to_frame(&records)?)?;
        tracing::info!(path = ?output, games = records.len(), "Wrote predictions");

        print!(
            "{}",
            format_predictions(
                self.season,
                self.week,
                &records,
                config.prediction.edge_alert_points
            )
        );
        println!("Saved to {}", output.display());
        Ok(())
    }
}
