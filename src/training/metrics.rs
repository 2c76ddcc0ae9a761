//! Cross-validation error metrics

use serde::{Deserialize, Serialize};

/// Out-of-sample error of one fold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldMetrics {
    pub train_rows: usize,
    pub validation_rows: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Coefficient of determination; 0 when the validation targets are constant
    pub r2: f64,
}

impl FoldMetrics {
    pub fn compute(train_rows: usize, actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len().min(predicted.len());
        if n == 0 {
            return Self {
                train_rows,
                validation_rows: 0,
                mae: 0.0,
                rmse: 0.0,
                r2: 0.0,
            };
        }
        let nf = n as f64;
        let residuals: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();
        let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / nf;
        let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
        let mean = actual[..n].iter().sum::<f64>() / nf;
        let ss_tot: f64 = actual[..n].iter().map(|a| (a - mean).powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Self {
            train_rows,
            validation_rows: n,
            mae,
            rmse: (ss_res / nf).sqrt(),
            r2,
        }
    }
}

/// Mean and population standard deviation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub mean: f64,
    pub std: f64,
}

impl Spread {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std: var.sqrt(),
        }
    }
}

/// Aggregate cross-validation diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvSummary {
    pub folds: Vec<FoldMetrics>,
    pub mae: Spread,
    pub rmse: Spread,
    pub r2: Spread,
}

impl CvSummary {
    pub fn from_folds(folds: &[FoldMetrics]) -> Self {
        let collect = |f: fn(&FoldMetrics) -> f64| folds.iter().map(f).collect::<Vec<_>>();
        Self {
            mae: Spread::of(&collect(|m| m.mae)),
            rmse: Spread::of(&collect(|m| m.rmse)),
            r2: Spread::of(&collect(|m| m.r2)),
            folds: folds.to_vec(),
        }
    }

    /// Fold-by-fold table followed by the aggregate line
    pub fn format_table(&self, title: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!("\n{}\n{}\n", "═".repeat(58), title));
        out.push_str(&format!("{}\n", "─".repeat(58)));
        out.push_str(&format!(
            "{:<6} {:>8} {:>8} {:>10} {:>10} {:>10}\n",
            "Fold", "Train", "Valid", "MAE", "RMSE", "R²"
        ));
        for (i, fold) in self.folds.iter().enumerate() {
            out.push_str(&format!(
                "{:<6} {:>8} {:>8} {:>10.3} {:>10.3} {:>10.3}\n",
                i + 1,
                fold.train_rows,
                fold.validation_rows,
                fold.mae,
                fold.rmse,
                fold.r2
            ));
        }
        out.push_str(&format!("{}\n", "─".repeat(58)));
        out.push_str(&format!(
            "CV MAE:  {:.3} ± {:.3}\nCV RMSE: {:.3} ± {:.3}\nCV R²:   {:.3} ± {:.3}\n",
            self.mae.mean, self.mae.std, self.rmse.mean, self.rmse.std, self.r2.mean, self.r2.std
        ));
        out.push_str(&format!("{}\n", "═".repeat(58)));
        out
    }
}
