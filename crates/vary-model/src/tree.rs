//! Binary decision tree stored as parallel node arrays.
//!
//! Node `0` is the root. For every node id:
//! - `children_left` / `children_right`: child ids, `-1` for a leaf
//! - `feature`: feature index tested, `-2` for a leaf
//! - `threshold`: rows with `value <= threshold` go left, `-2.0` for a leaf
//! - `value`: training population per class, in `classes` order
//!
//! Nodes are numbered in depth-first order, left subtree first.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Child id of a leaf.
pub const CHILD_LEAF: i64 = -1;
/// Feature index of a leaf.
pub const FEATURE_LEAF: i64 = -2;
/// Threshold of a leaf.
pub const THRESHOLD_LEAF: f64 = -2.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("node arrays have inconsistent lengths")]
    InconsistentArrays,

    #[error("tree has no nodes")]
    Empty,

    #[error("node {node}: child {child} out of range")]
    InvalidChild { node: usize, child: i64 },

    #[error("node {node}: feature {feature} out of range")]
    InvalidFeature { node: usize, feature: i64 },

    #[error("node {node}: population has {found} classes, expected {expected}")]
    PopulationWidth {
        node: usize,
        expected: usize,
        found: usize,
    },

    #[error("no training rows")]
    NoRows,

    #[error("row {row} has {found} features, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Fitting parameters.
#[derive(Debug, Clone)]
pub struct TreeParams {
    /// Nodes with fewer rows are not split.
    pub min_samples_split: usize,
    /// Seed of the feature visiting order, which breaks ties between
    /// equally good splits.
    pub seed: u64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            min_samples_split: 4,
            seed: 99,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<Vec<f64>>,
    classes: Vec<bool>,
    n_features: usize,
}

impl DecisionTree {
    /// Build a tree from its raw arrays, checking their consistency.
    pub fn from_arrays(
        children_left: Vec<i64>,
        children_right: Vec<i64>,
        feature: Vec<i64>,
        threshold: Vec<f64>,
        value: Vec<Vec<f64>>,
        classes: Vec<bool>,
        n_features: usize,
    ) -> Result<Self, TreeError> {
        let n = children_left.len();
        if children_right.len() != n || feature.len() != n || threshold.len() != n || value.len() != n {
            return Err(TreeError::InconsistentArrays);
        }
        if n == 0 {
            return Err(TreeError::Empty);
        }
        for node in 0..n {
            for child in [children_left[node], children_right[node]] {
                if child != CHILD_LEAF && (child <= node as i64 || child >= n as i64) {
                    return Err(TreeError::InvalidChild { node, child });
                }
            }
            if (children_left[node] == CHILD_LEAF) != (children_right[node] == CHILD_LEAF) {
                return Err(TreeError::InvalidChild {
                    node,
                    child: CHILD_LEAF,
                });
            }
            let f = feature[node];
            if children_left[node] != CHILD_LEAF && (f < 0 || f >= n_features as i64) {
                return Err(TreeError::InvalidFeature { node, feature: f });
            }
            if value[node].len() != classes.len() {
                return Err(TreeError::PopulationWidth {
                    node,
                    expected: classes.len(),
                    found: value[node].len(),
                });
            }
        }
        Ok(Self {
            children_left,
            children_right,
            feature,
            threshold,
            value,
            classes,
            n_features,
        })
    }

    /// Fit a CART classifier with Gini impurity on `rows` labelled `labels`.
    pub fn fit(rows: &[Vec<f64>], labels: &[bool], params: &TreeParams) -> Result<Self, TreeError> {
        if rows.is_empty() {
            return Err(TreeError::NoRows);
        }
        if rows.len() != labels.len() {
            return Err(TreeError::InconsistentArrays);
        }
        let n_features = rows[0].len();
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_features) {
            return Err(TreeError::RowWidth {
                row,
                expected: n_features,
                found: r.len(),
            });
        }

        let classes: Vec<bool> = labels.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let targets: Vec<usize> = labels
            .iter()
            .map(|l| usize::from(classes.len() == 2 && *l))
            .collect();

        let mut builder = Builder {
            rows,
            targets: &targets,
            n_classes: classes.len(),
            params,
            rng: ChaCha8Rng::seed_from_u64(params.seed),
            tree: DecisionTree {
                children_left: Vec::new(),
                children_right: Vec::new(),
                feature: Vec::new(),
                threshold: Vec::new(),
                value: Vec::new(),
                classes,
                n_features,
            },
        };
        builder.build((0..rows.len()).collect());
        Ok(builder.tree)
    }

    pub fn children_left(&self) -> &[i64] {
        &self.children_left
    }

    pub fn children_right(&self) -> &[i64] {
        &self.children_right
    }

    pub fn feature(&self) -> &[i64] {
        &self.feature
    }

    pub fn threshold(&self) -> &[f64] {
        &self.threshold
    }

    pub fn value(&self) -> &[Vec<f64>] {
        &self.value
    }

    pub fn classes(&self) -> &[bool] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] == CHILD_LEAF
    }

    pub fn leaf_count(&self) -> usize {
        (0..self.node_count()).filter(|&n| self.is_leaf(n)).count()
    }

    /// Longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if !self.is_leaf(node) {
                stack.push((self.children_left[node] as usize, depth + 1));
                stack.push((self.children_right[node] as usize, depth + 1));
            }
        }
        deepest
    }

    /// Thresholds of every split on `feature`, in node order.
    pub fn thresholds_for(&self, feature: usize) -> Vec<f64> {
        (0..self.node_count())
            .filter(|&n| !self.is_leaf(n) && self.feature[n] == feature as i64)
            .map(|n| self.threshold[n])
            .collect()
    }

    /// Majority class of the leaf reached by a complete feature row.
    pub fn predict_row(&self, row: &[f64]) -> bool {
        let mut node = 0usize;
        while !self.is_leaf(node) {
            let x = row.get(self.feature[node] as usize).copied().unwrap_or(0.0);
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        self.majority(node)
    }

    /// Majority class of a node, earliest class on ties.
    pub fn majority(&self, node: usize) -> bool {
        let population = &self.value[node];
        let mut best = 0;
        for (i, count) in population.iter().enumerate() {
            if *count > population[best] {
                best = i;
            }
        }
        self.classes.get(best).copied().unwrap_or(false)
    }

    fn push_node(&mut self, population: Vec<f64>) -> usize {
        self.children_left.push(CHILD_LEAF);
        self.children_right.push(CHILD_LEAF);
        self.feature.push(FEATURE_LEAF);
        self.threshold.push(THRESHOLD_LEAF);
        self.value.push(population);
        self.children_left.len() - 1
    }
}

// ── Fitting ──────────────────────────────────────────────────────────

struct Builder<'a> {
    rows: &'a [Vec<f64>],
    targets: &'a [usize],
    n_classes: usize,
    params: &'a TreeParams,
    rng: ChaCha8Rng,
    tree: DecisionTree,
}

struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(counts: &[f64], total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

impl Builder<'_> {
    fn population(&self, indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[self.targets[i]] += 1.0;
        }
        counts
    }

    /// Grow the subtree for `indices`, returning its root id.
    fn build(&mut self, indices: Vec<usize>) -> usize {
        let population = self.population(&indices);
        let impurity = gini(&population, indices.len() as f64);
        let node = self.tree.push_node(population);

        if indices.len() < self.params.min_samples_split || impurity <= f64::EPSILON {
            return node;
        }
        let Some(split) = self.best_split(&indices) else {
            return node;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.rows[i][split.feature] <= split.threshold);

        self.tree.feature[node] = split.feature as i64;
        self.tree.threshold[node] = split.threshold;
        let left_id = self.build(left);
        let right_id = self.build(right);
        self.tree.children_left[node] = left_id as i64;
        self.tree.children_right[node] = right_id as i64;
        node
    }

    /// Lowest weighted child impurity over all features, visited in a
    /// seeded random order; the first best split found wins.
    fn best_split(&mut self, indices: &[usize]) -> Option<Split> {
        let mut order: Vec<usize> = (0..self.tree.n_features).collect();
        order.shuffle(&mut self.rng);

        let total = indices.len() as f64;
        let parent = self.population(indices);
        let mut best: Option<Split> = None;
        let mut sorted = indices.to_vec();

        for feature in order {
            sorted.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let mut left = vec![0.0; self.n_classes];
            for pos in 0..sorted.len() - 1 {
                left[self.targets[sorted[pos]]] += 1.0;
                let here = self.rows[sorted[pos]][feature];
                let next = self.rows[sorted[pos + 1]][feature];
                if here >= next {
                    continue;
                }

                let n_left = (pos + 1) as f64;
                let n_right = total - n_left;
                let right: Vec<f64> = parent.iter().zip(&left).map(|(p, l)| p - l).collect();
                let impurity =
                    (n_left * gini(&left, n_left) + n_right * gini(&right, n_right)) / total;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = (here + next) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }
        best
    }
}
