//! Regression trees used as conditional models for donor-based imputation.
//!
//! A tree partitions the predictor space by least-squares splits. Imputation
//! does not use the leaf means: each leaf is a pool of observed donors, and
//! a missing cell receives a value drawn from the donors sharing its leaf.

use nalgebra::DMatrix;
use rand::seq::index::sample;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Growth parameters for a single tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    /// Predictors considered at each split.
    pub max_features: usize,
    /// Minimum number of training rows in a leaf.
    pub min_leaf_size: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        leaf_id: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree stored as a flat node arena.
#[derive(Debug, Clone)]
pub(crate) struct RegressionTree {
    nodes: Vec<Node>,
    n_leaves: usize,
}

impl RegressionTree {
    /// Grow a tree on the given training rows of `x` (rows may repeat).
    pub fn fit(
        x: &DMatrix<f64>,
        y: &[f64],
        rows: &[usize],
        params: TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            n_leaves: 0,
        };
        tree.grow(x, y, rows.to_vec(), params, rng);
        tree
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Leaf reached by row `row` of `x`.
    pub fn leaf_of(&self, x: &DMatrix<f64>, row: usize) -> usize {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { leaf_id } => return *leaf_id,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[(row, *feature)] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Group donor values by leaf: every row of `x` is routed and its `y` appended.
    pub fn donor_pools(&self, x: &DMatrix<f64>, y: &[f64]) -> Vec<Vec<f64>> {
        let mut pools = vec![Vec::new(); self.n_leaves];
        for (row, &value) in y.iter().enumerate() {
            pools[self.leaf_of(x, row)].push(value);
        }
        pools
    }

    fn grow(
        &mut self,
        x: &DMatrix<f64>,
        y: &[f64],
        rows: Vec<usize>,
        params: TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let node_idx = self.nodes.len();

        let split = if rows.len() >= 2 * params.min_leaf_size && !is_constant(y, &rows) {
            best_split(x, y, &rows, params, rng)
        } else {
            None
        };

        match split {
            Some((feature, threshold)) => {
                // Reserve the slot so children are appended after their parent
                self.nodes.push(Node::Leaf { leaf_id: 0 });
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                    rows.iter().partition(|&&r| x[(r, feature)] <= threshold);
                let left = self.grow(x, y, left_rows, params, rng);
                let right = self.grow(x, y, right_rows, params, rng);
                self.nodes[node_idx] = Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                };
            }
            None => {
                self.nodes.push(Node::Leaf {
                    leaf_id: self.n_leaves,
                });
                self.n_leaves += 1;
            }
        }
        node_idx
    }
}

/// Find the split with the largest reduction in squared error.
fn best_split(
    x: &DMatrix<f64>,
    y: &[f64],
    rows: &[usize],
    params: TreeParams,
    rng: &mut ChaCha8Rng,
) -> Option<(usize, f64)> {
    let n_features = x.ncols();
    let n_try = params.max_features.clamp(1, n_features);
    let features: Vec<usize> = if n_try == n_features {
        (0..n_features).collect()
    } else {
        sample(rng, n_features, n_try).into_vec()
    };

    let n = rows.len() as f64;
    let total_sum: f64 = rows.iter().map(|&r| y[r]).sum();
    let total_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n;

    let mut best: Option<(usize, f64, f64)> = None;

    for feature in features {
        let mut ordered: Vec<(f64, f64)> = rows.iter().map(|&r| (x[(r, feature)], y[r])).collect();
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for i in 0..ordered.len() - 1 {
            let (xv, yv) = ordered[i];
            left_sum += yv;
            left_sq += yv * yv;

            let n_left = i + 1;
            let n_right = ordered.len() - n_left;
            if n_left < params.min_leaf_size || n_right < params.min_leaf_size {
                continue;
            }
            let next_x = ordered[i + 1].0;
            if next_x <= xv {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left as f64)
                + (right_sq - right_sum * right_sum / n_right as f64);
            let gain = parent_sse - sse;

            if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                best = Some((feature, (xv + next_x) / 2.0, gain));
            }
        }
    }

    best.map(|(feature, threshold, _)| (feature, threshold))
}

fn is_constant(y: &[f64], rows: &[usize]) -> bool {
    match rows.first() {
        Some(&first) => rows.iter().all(|&r| y[r] == y[first]),
        None => true,
    }
}

/// Draw one value uniformly from a non-empty pool.
pub(crate) fn draw_donor(pool: &[f64], rng: &mut ChaCha8Rng) -> f64 {
    pool[rng.gen_range(0..pool.len())]
}
