//! Squared-error regression tree
//!
//! Trees are grown greedily, one split at a time. Leaf weights and split
//! gains use an L2 penalty on the leaf weight (the same form gradient
//! boosting libraries use for the squared-error objective), so a tree with
//! `lambda = 0` is a plain mean-per-leaf regression tree.

use crate::{MathError, Result};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Growth limits for a regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    /// Maximum depth of any leaf (root is depth 0)
    pub max_depth: usize,
    /// Minimum number of samples in each child of a split
    pub min_samples_leaf: usize,
    /// L2 penalty on leaf weights
    pub lambda: f64,
    /// Minimum gain required to keep a split
    pub min_split_gain: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_samples_leaf: 1,
            lambda: 1.0,
            min_split_gain: 0.0,
        }
    }
}

/// Node of a fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Terminal node holding the predicted value
    Leaf { value: f64 },
    /// Internal node; rows with `x[feature] <= threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
    n_features: usize,
}

/// Best split candidate found for a node
struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fit a tree to `targets` using only the given row indices of `x`
    pub fn fit(
        x: ArrayView2<f64>,
        targets: &[f64],
        rows: &[usize],
        params: &TreeParams,
    ) -> Result<Self> {
        if x.nrows() != targets.len() {
            return Err(MathError::InvalidInput(format!(
                "Feature rows ({}) and targets ({}) differ in length",
                x.nrows(),
                targets.len()
            )));
        }
        if rows.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot grow a tree from zero rows".to_string(),
            ));
        }
        if let Some(&bad) = rows.iter().find(|&&r| r >= targets.len()) {
            return Err(MathError::InvalidInput(format!(
                "Row index {} is out of bounds for {} rows",
                bad,
                targets.len()
            )));
        }
        if params.lambda < 0.0 {
            return Err(MathError::InvalidInput(
                "Leaf penalty lambda must be non-negative".to_string(),
            ));
        }

        let mut rows = rows.to_vec();
        let root = grow(x, targets, &mut rows, 0, params);

        Ok(Self {
            root,
            n_features: x.ncols(),
        })
    }

    /// Predict one value per row of `x`
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<f64>> {
        if x.ncols() != self.n_features {
            return Err(MathError::InvalidInput(format!(
                "Expected {} feature columns, got {}",
                self.n_features,
                x.ncols()
            )));
        }

        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                let mut node = &self.root;
                loop {
                    match node {
                        TreeNode::Leaf { value } => break *value,
                        TreeNode::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            node = if row[*feature] <= *threshold { &**left } else { &**right };
                        }
                    }
                }
            })
            .collect())
    }

    /// Root node of the tree
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Number of leaves
    pub fn n_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        count(&self.root)
    }
}

fn leaf_value(sum: f64, count: usize, lambda: f64) -> f64 {
    let denom = count as f64 + lambda;
    if denom > 0.0 {
        sum / denom
    } else {
        0.0
    }
}

fn score(sum: f64, count: usize, lambda: f64) -> f64 {
    let denom = count as f64 + lambda;
    if denom > 0.0 {
        sum * sum / denom
    } else {
        0.0
    }
}

fn grow(
    x: ArrayView2<f64>,
    targets: &[f64],
    rows: &mut [usize],
    depth: usize,
    params: &TreeParams,
) -> TreeNode {
    let sum: f64 = rows.iter().map(|&r| targets[r]).sum();
    let leaf = TreeNode::Leaf {
        value: leaf_value(sum, rows.len(), params.lambda),
    };

    if depth >= params.max_depth || rows.len() < 2 * params.min_samples_leaf.max(1) {
        return leaf;
    }

    let candidate = match best_split(x, targets, rows, sum, params) {
        Some(c) => c,
        None => return leaf,
    };

    // in-place partition: left rows first
    let mut boundary = 0;
    for i in 0..rows.len() {
        if x[[rows[i], candidate.feature]] <= candidate.threshold {
            rows.swap(i, boundary);
            boundary += 1;
        }
    }
    let (left_rows, right_rows) = rows.split_at_mut(boundary);

    TreeNode::Split {
        feature: candidate.feature,
        threshold: candidate.threshold,
        left: Box::new(grow(x, targets, left_rows, depth + 1, params)),
        right: Box::new(grow(x, targets, right_rows, depth + 1, params)),
    }
}

fn best_split(
    x: ArrayView2<f64>,
    targets: &[f64],
    rows: &[usize],
    total_sum: f64,
    params: &TreeParams,
) -> Option<Candidate> {
    let n = rows.len();
    let min_leaf = params.min_samples_leaf.max(1);
    let parent_score = score(total_sum, n, params.lambda);
    let mut best: Option<Candidate> = None;
    let mut order: Vec<usize> = rows.to_vec();

    for feature in 0..x.ncols() {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left_sum = 0.0;
        for k in 0..n - 1 {
            left_sum += targets[order[k]];
            let left_count = k + 1;
            let right_count = n - left_count;
            if left_count < min_leaf || right_count < min_leaf {
                continue;
            }

            let here = x[[order[k], feature]];
            let next = x[[order[k + 1], feature]];
            if here >= next {
                continue;
            }

            let gain = score(left_sum, left_count, params.lambda)
                + score(total_sum - left_sum, right_count, params.lambda)
                - parent_score;

            if gain > params.min_split_gain && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(Candidate {
                    feature,
                    threshold: here + (next - here) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}
