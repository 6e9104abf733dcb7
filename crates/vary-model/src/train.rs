//! Classifier training on the sample table.
//!
//! Rows are never shuffled: the first `floor(N * fraction / 100)` rows train
//! the tree and the rest measure its accuracy.

use serde::{Deserialize, Serialize};

use crate::encode::{EncodeError, FeatureSpace};
use crate::store::{Sample, SampleStore};
use crate::tree::{DecisionTree, TreeError, TreeParams};

#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("no samples to train on")]
    EmptyDataset,

    #[error("training fraction {fraction} is outside 1..=100")]
    InvalidFraction { fraction: f64 },

    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("fitting failed: {0}")]
    Tree(#[from] TreeError),
}

/// Whether a rendered configuration is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetConstraint {
    pub max_pages: u32,
}

impl TargetConstraint {
    pub fn is_satisfied(&self, sample: &Sample) -> bool {
        sample.nb_pages <= self.max_pages && sample.space >= 0.0
    }
}

/// A fitted tree with the feature space its rows were encoded in.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub tree: DecisionTree,
    pub features: FeatureSpace,
    /// Held-out accuracy, `None` when every row was used for training.
    pub accuracy: Option<f64>,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Number of training rows for `total` rows at `fraction` percent.
pub fn train_size(total: usize, fraction: f64) -> usize {
    (total as f64 * fraction / 100.0).floor() as usize
}

pub fn train(
    store: &SampleStore,
    fraction: f64,
    target: &TargetConstraint,
) -> Result<TrainedModel, TrainError> {
    if !(1.0..=100.0).contains(&fraction) {
        return Err(TrainError::InvalidFraction { fraction });
    }
    if store.is_empty() {
        return Err(TrainError::EmptyDataset);
    }

    let samples = store.samples();
    let features = FeatureSpace::from_samples(store.schema(), samples);
    let rows = samples
        .iter()
        .map(|s| features.encode(&s.config))
        .collect::<Result<Vec<_>, _>>()?;
    let labels: Vec<bool> = samples.iter().map(|s| target.is_satisfied(s)).collect();

    let split = train_size(samples.len(), fraction);
    if split == 0 {
        return Err(TrainError::EmptyDataset);
    }
    let tree = DecisionTree::fit(&rows[..split], &labels[..split], &TreeParams::default())?;

    let test_rows = samples.len() - split;
    let accuracy = (fraction < 100.0 && test_rows > 0).then(|| {
        let correct = rows[split..]
            .iter()
            .zip(&labels[split..])
            .filter(|(row, label)| tree.predict_row(row) == **label)
            .count();
        correct as f64 / test_rows as f64
    });

    log::info!(
        "trained tree on {split} rows: {} nodes, {} leaves, depth {}",
        tree.node_count(),
        tree.leaf_count(),
        tree.depth()
    );
    if let Some(accuracy) = accuracy {
        log::info!("accuracy on {test_rows} held-out rows: {accuracy:.3}");
    }

    Ok(TrainedModel {
        tree,
        features,
        accuracy,
        train_rows: split,
        test_rows,
    })
}
