//! Gradient-boosted regression trees
//!
//! Squared-loss boosting with second-order split gain:
//! gain = G_L²/(H_L+λ) + G_R²/(H_R+λ) - G²/(H+λ), leaf weight = -G/(H+λ).
//! Features are pre-binned into at most `max_bins` buckets per column and a
//! row goes left when `x <= threshold`.

use super::{FeatureMatrix, FittedModel, Regressor};
use crate::config::TrainingConfig;
use crate::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Smallest gain accepted for a split
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub subsample: f64,
    pub colsample: f64,
    pub lambda: f64,
    pub min_child_weight: f64,
    pub max_bins: usize,
    pub seed: u64,
}

impl From<&TrainingConfig> for GbmParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            learning_rate: config.learning_rate,
            subsample: config.subsample,
            colsample: config.colsample,
            lambda: config.lambda,
            min_child_weight: config.min_child_weight,
            max_bins: config.max_bins,
            seed: config.seed,
        }
    }
}

impl Default for GbmParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

/// Fitted ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbmEnsemble {
    params: GbmParams,
    n_features: usize,
    base_score: f64,
    trees: Vec<Tree>,
    importance: Vec<f64>,
}

impl GbmEnsemble {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl FittedModel for GbmEnsemble {
    fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    fn feature_importance(&self) -> Vec<f64> {
        self.importance.clone()
    }
}

/// Gradient-boosting learner
#[derive(Debug, Clone, Default)]
pub struct GbmRegressor {
    params: GbmParams,
}

impl GbmRegressor {
    pub fn new(params: GbmParams) -> Self {
        Self { params }
    }
}

impl Regressor for GbmRegressor {
    type Fitted = GbmEnsemble;

    fn fit(&self, features: &FeatureMatrix, targets: &[f64]) -> Result<GbmEnsemble> {
        let n = features.n_rows();
        if n == 0 {
            return Err(PipelineError::Schema("cannot fit on zero rows".into()));
        }
        if targets.len() != n {
            return Err(PipelineError::Schema(format!(
                "{} targets for {} feature rows",
                targets.len(),
                n
            )));
        }
        let n_features = features.n_cols();
        let params = &self.params;

        let cuts: Vec<Vec<f64>> = (0..n_features)
            .map(|f| bin_cuts((0..n).map(|i| features.get(i, f)), params.max_bins))
            .collect();
        let bins: Vec<Vec<u16>> = (0..n_features)
            .map(|f| {
                (0..n)
                    .map(|i| bin_index(&cuts[f], features.get(i, f)))
                    .collect()
            })
            .collect();

        let base_score = targets.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![base_score; n];
        let mut gains = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let hess = vec![1.0; n];

        let n_sampled_cols = ((params.colsample * n_features as f64).round() as usize).clamp(1, n_features.max(1));

        for _ in 0..params.n_estimators {
            let grad: Vec<f64> = predictions
                .iter()
                .zip(targets)
                .map(|(p, y)| p - y)
                .collect();

            let mut rows: Vec<usize> = if params.subsample < 1.0 {
                (0..n).filter(|_| rng.gen::<f64>() < params.subsample).collect()
            } else {
                (0..n).collect()
            };
            if rows.is_empty() {
                rows = (0..n).collect();
            }

            let mut columns = if n_features == 0 {
                Vec::new()
            } else {
                rand::seq::index::sample(&mut rng, n_features, n_sampled_cols).into_vec()
            };
            columns.sort_unstable();

            let mut builder = TreeBuilder {
                bins: &bins,
                cuts: &cuts,
                grad: &grad,
                hess: &hess,
                columns: &columns,
                params,
                gains: &mut gains,
                nodes: Vec::new(),
            };
            builder.grow(&mut rows, 0);
            let tree = Tree {
                nodes: builder.nodes,
            };

            for (i, p) in predictions.iter_mut().enumerate() {
                *p += tree.predict_row(features.row(i));
            }
            trees.push(tree);
        }

        let total_gain: f64 = gains.iter().sum();
        let importance = if total_gain > 0.0 {
            gains.iter().map(|g| g / total_gain).collect()
        } else {
            vec![0.0; n_features]
        };

        tracing::debug!(
            rows = n,
            features = n_features,
            trees = trees.len(),
            base_score,
            "Fitted boosted trees"
        );

        Ok(GbmEnsemble {
            params: params.clone(),
            n_features,
            base_score,
            trees,
            importance,
        })
    }
}

/// Split thresholds for one feature.
///
/// With few distinct values every value but the largest is a threshold;
/// otherwise thresholds sit at evenly spaced quantiles.
fn bin_cuts(values: impl Iterator<Item = f64>, max_bins: usize) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(f64::total_cmp);

    let mut unique = sorted.clone();
    unique.dedup();
    if unique.len() <= max_bins {
        unique.pop();
        return unique;
    }

    let mut cuts: Vec<f64> = (1..max_bins)
        .map(|q| sorted[q * sorted.len() / max_bins])
        .collect();
    cuts.dedup();
    if let (Some(last), Some(max)) = (cuts.last(), sorted.last()) {
        if last >= max {
            cuts.pop();
        }
    }
    cuts
}

/// Bucket of `x`: the number of thresholds strictly below it
fn bin_index(cuts: &[f64], x: f64) -> u16 {
    cuts.partition_point(|c| *c < x) as u16
}

struct SplitCandidate {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct TreeBuilder<'a> {
    bins: &'a [Vec<u16>],
    cuts: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    columns: &'a [usize],
    params: &'a GbmParams,
    gains: &'a mut [f64],
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `rows`; returns its node index
    fn grow(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| self.hess[i]).sum();

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.leaf_value(g, h),
        });

        if depth >= self.params.max_depth || rows.len() < 2 {
            return idx;
        }
        let Some(best) = self.best_split(rows, g, h) else {
            return idx;
        };

        self.gains[best.feature] += best.gain;
        let feature_bins = &self.bins[best.feature];
        let split = partition(rows, |i| feature_bins[i] as usize <= best.bin);
        let (left_rows, right_rows) = rows.split_at_mut(split);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: self.cuts[best.feature][best.bin],
            left,
            right,
        };
        idx
    }

    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        -g / (h + self.params.lambda) * self.params.learning_rate
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda)
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let parent = self.score(g, h);
        let mut best: Option<SplitCandidate> = None;

        for &feature in self.columns {
            let n_cuts = self.cuts[feature].len();
            if n_cuts == 0 {
                continue;
            }
            let mut hist = vec![(0.0, 0.0); n_cuts + 1];
            for &i in rows {
                let b = self.bins[feature][i] as usize;
                hist[b].0 += self.grad[i];
                hist[b].1 += self.hess[i];
            }

            let (mut gl, mut hl) = (0.0, 0.0);
            for (bin, (bg, bh)) in hist.iter().take(n_cuts).enumerate() {
                gl += bg;
                hl += bh;
                let (gr, hr) = (g - gl, h - hl);
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }
                if hl <= 0.0 || hr <= 0.0 {
                    continue;
                }
                let gain = self.score(gl, hl) + self.score(gr, hr) - parent;
                if gain > MIN_SPLIT_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate { feature, bin, gain });
                }
            }
        }
        best
    }
}

/// Reorder `rows` so rows satisfying `pred` come first; returns their count
fn partition(rows: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut split = 0;
    for j in 0..rows.len() {
        if pred(rows[j]) {
            rows.swap(split, j);
            split += 1;
        }
    }
    split
}
