//! CART regression tree.
//!
//! Nodes live in a flat arena indexed by position; the root is node 0. The
//! tree is grown iteratively from a work stack, so depth is bounded only by
//! `max_depth` and not by the call stack.

use super::{check_row, check_training_set, ModelError, Regressor};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// A tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Terminal node predicting the mean target of its samples.
    Leaf {
        /// Predicted value.
        value: f64,
    },
    /// Internal node: rows with `feature <= threshold` go left.
    Split {
        /// Feature column index.
        feature: usize,
        /// Split threshold (midpoint between adjacent distinct values).
        threshold: f64,
        /// Index of the left child.
        left: usize,
        /// Index of the right child.
        right: usize,
    },
}

/// Regression tree minimizing squared error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    /// Maximum depth; `None` grows until leaves are pure or too small.
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node.
    pub min_samples_split: usize,
    /// Minimum samples required in each child.
    pub min_samples_leaf: usize,
    n_features: Option<usize>,
    nodes: Vec<Node>,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            n_features: None,
            nodes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl DecisionTreeRegressor {
    /// Creates an unfitted tree with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the tree depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets the minimum number of samples per leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf.max(1);
        self
    }

    /// Number of nodes in the fitted tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the fitted tree (a single leaf has depth 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0_usize, 0_usize)];
        while let Some((index, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(Node::Split { left, right, .. }) = self.nodes.get(index) {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }

    /// Checks that the arena forms a tree over `n_features` inputs: every
    /// split reads an existing feature and points forward to existing nodes,
    /// so prediction always reaches a leaf.
    pub(crate) fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        let inconsistent = |msg: String| Err(ModelError::Inconsistent(msg));

        if self.n_features != Some(n_features) {
            return inconsistent(format!(
                "tree was fitted on {:?} features, artifact names {n_features}",
                self.n_features
            ));
        }
        if self.nodes.is_empty() {
            return inconsistent("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } if !value.is_finite() => {
                    return inconsistent(format!("leaf {index} has non-finite value"));
                }
                Node::Leaf { .. } => {}
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return inconsistent(format!(
                            "node {index} splits on feature {feature} of {n_features}"
                        ));
                    }
                    if threshold.is_nan() {
                        return inconsistent(format!("node {index} has a NaN threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return inconsistent(format!(
                                "node {index} has invalid child {child}"
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Finds the split of `indices` with the smallest children's squared
    /// error, or `None` if no admissible split exists.
    fn best_split(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        indices: &[usize],
    ) -> Option<BestSplit> {
        let total: f64 = indices.iter().map(|&i| y[i]).sum();
        let min_leaf = self.min_samples_leaf;

        let mut best: Option<BestSplit> = None;
        let mut sorted = indices.to_vec();

        for feature in 0..x.ncols() {
            sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left_sum = 0.0;
            for pos in 0..sorted.len() - 1 {
                left_sum += y[sorted[pos]];
                let left_count = pos + 1;
                let right_count = sorted.len() - left_count;
                if left_count < min_leaf || right_count < min_leaf {
                    continue;
                }

                let current = x[[sorted[pos], feature]];
                let next = x[[sorted[pos + 1], feature]];
                if current >= next {
                    continue;
                }

                let right_sum = total - left_sum;
                // Maximizing sum_l^2/n_l + sum_r^2/n_r minimizes the children's SSE.
                #[allow(clippy::cast_precision_loss)]
                let score = left_sum * left_sum / left_count as f64
                    + right_sum * right_sum / right_count as f64;

                if best.map_or(true, |b| score > b.score) {
                    let mut threshold = current / 2.0 + next / 2.0;
                    if threshold >= next {
                        threshold = current;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        score,
                    });
                }
            }
        }

        best
    }
}

impl Regressor for DecisionTreeRegressor {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError> {
        check_training_set(x, y)?;

        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut stack: Vec<(usize, Vec<usize>, usize)> = vec![(0, (0..x.nrows()).collect(), 0)];

        while let Some((node_index, indices, depth)) = stack.pop() {
            #[allow(clippy::cast_precision_loss)]
            let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64;

            let tolerance = 1e-12 * mean.abs().max(1.0);
            let pure = indices.iter().all(|&i| (y[i] - mean).abs() <= tolerance);
            let can_split = !pure
                && indices.len() >= self.min_samples_split.max(2)
                && self.max_depth.map_or(true, |max| depth < max);

            let split = if can_split {
                self.best_split(x, y, &indices)
            } else {
                None
            };

            let Some(split) = split else {
                nodes[node_index] = Node::Leaf { value: mean };
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| x[[i, split.feature]] <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[node_index] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            stack.push((right, right_rows, depth + 1));
            stack.push((left, left_rows, depth + 1));
        }

        self.nodes = nodes;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        check_row(self.n_features, row)?;

        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Leaf { value }) => return Ok(*value),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).ok_or_else(|| {
                        ModelError::Inconsistent(format!(
                            "node {index} splits on missing feature {feature}"
                        ))
                    })?;
                    let next = if value <= threshold { *left } else { *right };
                    // Children always follow their parent in the arena.
                    if next <= index {
                        return Err(ModelError::Inconsistent(format!(
                            "node {index} points back to node {next}"
                        )));
                    }
                    index = next;
                }
                None if index == 0 => return Err(ModelError::NotFitted),
                None => {
                    return Err(ModelError::Inconsistent(format!(
                        "node {index} does not exist"
                    )))
                }
            }
        }
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2, Axis};

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((10, 2), |(i, j)| {
            #[allow(clippy::cast_precision_loss)]
            let i = i as f64;
            if j == 0 {
                i
            } else {
                0.0
            }
        });
        let y = Array1::from_shape_fn(10, |i| if i < 5 { 1.0 } else { 10.0 });
        (x, y)
    }

    fn predict(tree: &DecisionTreeRegressor, row: &[f64]) -> f64 {
        tree.predict_row(ArrayView1::from(row)).unwrap()
    }

    #[test]
    fn test_learns_step_function_with_single_split() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(x.view(), y.view()).unwrap();

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.depth(), 1);
        assert_eq!(predict(&tree, &[2.0, 0.0]), 1.0);
        assert_eq!(predict(&tree, &[7.0, 0.0]), 10.0);
        assert_eq!(predict(&tree, &[4.5, 0.0]), 1.0);
        assert_eq!(predict(&tree, &[4.6, 0.0]), 10.0);
    }

    #[test]
    fn test_unbounded_tree_fits_training_data_exactly() {
        let x = Array2::from_shape_fn((50, 2), |(i, j)| {
            #[allow(clippy::cast_precision_loss)]
            let i = i as f64;
            if j == 0 {
                i % 7.0
            } else {
                (i / 7.0).floor()
            }
        });
        let y = x.map_axis(Axis(1), |r| r[0] * r[0] - 3.0 * r[1]);

        let mut tree = DecisionTreeRegressor::new();
        tree.fit(x.view(), y.view()).unwrap();

        let predictions = tree.predict(x.view()).unwrap();
        for (p, t) in predictions.iter().zip(&y) {
            assert!((p - t).abs() < 1e-9);
        }
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = Array2::from_shape_fn((64, 1), |(i, _)| {
            #[allow(clippy::cast_precision_loss)]
            let i = i as f64;
            i
        });
        let y = x.column(0).to_owned();

        let mut tree = DecisionTreeRegressor::new().with_max_depth(3);
        tree.fit(x.view(), y.view()).unwrap();

        assert_eq!(tree.depth(), 3);
        assert!(tree.node_count() <= 15);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(x.view(), array![4.0, 4.0, 4.0].view()).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(predict(&tree, &[100.0]), 4.0);
    }

    #[test]
    fn test_min_samples_leaf_is_respected() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new().with_min_samples_leaf(6);
        tree.fit(x.view(), y.view()).unwrap();
        // Every split would leave a child with fewer than 6 rows.
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_tree_survives_serialization() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(x.view(), y.view()).unwrap();

        let json = serde_json::to_string(&tree).unwrap();
        let restored: DecisionTreeRegressor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tree);
        assert!(restored.validate(2).is_ok());
    }

    #[test]
    fn test_unfitted_tree_cannot_predict() {
        let tree = DecisionTreeRegressor::new();
        assert!(matches!(
            tree.predict_row(array![1.0].view()),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn test_malformed_nodes_fail_without_panicking() {
        let mut tree = DecisionTreeRegressor::new();
        tree.n_features = Some(2);

        tree.nodes = vec![
            Node::Split {
                feature: 99,
                threshold: 0.0,
                left: 1,
                right: 1,
            },
            Node::Leaf { value: 1.0 },
        ];
        assert!(matches!(
            tree.predict_row(array![1.0, 2.0].view()),
            Err(ModelError::Inconsistent(_))
        ));
        assert!(tree.validate(2).is_err());

        tree.nodes = vec![Node::Split {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
        }];
        assert!(matches!(
            tree.predict_row(array![1.0, 2.0].view()),
            Err(ModelError::Inconsistent(_))
        ));
        assert!(tree.validate(2).is_err());
    }
}
