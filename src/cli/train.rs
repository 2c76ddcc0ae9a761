//! Train command implementation

use crate::config::Config;
use crate::data::{read_frame, ColumnData, Frame, StagedWrites};
use crate::error::{PipelineError, Result};
use crate::features::{DataQuality, MatchupTable};
use crate::model::{Target, TrainedModel};
use crate::training::Trainer;
use clap::Args;
use std::collections::BTreeMap;

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Number of features shown in the importance table
    #[arg(long, default_value = "10")]
    pub top: usize,
}

impl TrainArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let table_path = config.paths.model_table_file();
        PipelineError::require_file(
            &table_path,
            "matchup table",
            "gridiron-edge build --season <SEASON>",
        )?;
        let mut quality = DataQuality::default();
        let table = MatchupTable::from_frame(&read_frame(&table_path)?, &mut quality)?;
        quality.report("train");

        let trainer = Trainer::new(config);
        // both models must fit before either artifact is replaced
        let margin = trainer.train(&table, Target::Margin)?;
        let total = trainer.train(&table, Target::Total)?;

        for model in [&margin, &total] {
            print!(
                "{}",
                model.cv.format_table(&format!(
                    "{} model: {} samples, {} features, {} rows dropped",
                    model.target.name().to_uppercase(),
                    model.training_samples,
                    model.feature_names.len(),
                    model.rows_dropped
                ))
            );
        }

        // no output is replaced unless all three are written
        let importance = importance_frame(&margin, &total)?;
        let importance_path = config.paths.importance_file();
        let mut staged = StagedWrites::new();
        margin.stage(&mut staged, &config.paths.model_file(Target::Margin))?;
        total.stage(&mut staged, &config.paths.model_file(Target::Total))?;
        staged.frame(&importance_path, &importance)?;
        staged.commit()?;
        tracing::info!(
            model_dir = ?config.paths.model_dir,
            importance = ?importance_path,
            "Saved models and importance report"
        );

        println!("\nTop {} features (average importance):", self.top);
        if let (Some(features), Some(avg)) = (
            importance.text("feature"),
            importance.numeric("importance_avg"),
        ) {
            for (name, value) in features.iter().zip(avg.values).take(self.top) {
                println!(
                    "  {:<40} {:.4}",
                    name.as_deref().unwrap_or("?"),
                    value.unwrap_or(0.0)
                );
            }
        }
        println!("\nModels saved to {}", config.paths.model_dir.display());
        println!("Importance report: {}", importance_path.display());
        Ok(())
    }
}

/// Per-feature importance of both models, sorted by their average
pub fn importance_frame<M>(margin: &TrainedModel<M>, total: &TrainedModel<M>) -> Result<Frame> {
    let mut by_feature: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for (name, value) in &margin.importance {
        by_feature.entry(name).or_default().0 = *value;
    }
    for (name, value) in &total.importance {
        by_feature.entry(name).or_default().1 = *value;
    }

    let mut rows: Vec<(&str, f64, f64, f64)> = by_feature
        .into_iter()
        .map(|(name, (m, t))| (name, m, t, (m + t) / 2.0))
        .collect();
    rows.sort_by(|a, b| b.3.total_cmp(&a.3).then_with(|| a.0.cmp(b.0)));

    Frame::new()
        .with_column(
            "feature",
            ColumnData::Text(rows.iter().map(|r| Some(r.0.to_string())).collect()),
        )?
        .with_column(
            "importance_margin",
            ColumnData::Numeric(rows.iter().map(|r| Some(r.1)).collect()),
        )?
        .with_column(
            "importance_total",
            ColumnData::Numeric(rows.iter().map(|r| Some(r.2)).collect()),
        )?
        .with_column(
            "importance_avg",
            ColumnData::Numeric(rows.iter().map(|r| Some(r.3)).collect()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::CvSummary;
    use chrono::Utc;

    fn model(target: Target, importance: &[(&str, f64)]) -> TrainedModel<()> {
        TrainedModel {
            target,
            feature_names: importance.iter().map(|(n, _)| n.to_string()).collect(),
            model: (),
            training_samples: 0,
            rows_dropped: 0,
            cv: CvSummary::default(),
            importance: importance.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
            trained_at: Utc::now(),
        }
    }

    #[test]
    fn test_importance_frame_sorted_by_average() {
        let margin = model(Target::Margin, &[("delta_a", 0.8), ("delta_b", 0.2)]);
        let total = model(Target::Total, &[("delta_b", 0.9), ("delta_c", 0.1)]);
        let frame = importance_frame(&margin, &total).unwrap();

        assert_eq!(
            frame.text("feature").unwrap(),
            vec![Some("delta_b".to_string()), Some("delta_a".to_string()), Some("delta_c".to_string())]
        );
        let avg = frame.numeric("importance_avg").unwrap().values;
        for (value, expected) in avg.iter().zip([0.55, 0.4, 0.05]) {
            approx::assert_relative_eq!(value.unwrap(), expected, epsilon = 1e-12);
        }
        let margin_col = frame.numeric("importance_margin").unwrap().values;
        assert_eq!(margin_col[2], Some(0.0));
    }
}
