//! Sample table and the classifier learned from it.
//!
//! - `store`: append-only table of observations, persisted as CSV
//! - `encode`: feature space with one-hot columns for enumerations
//! - `tree`: decision tree as parallel node arrays, plus a CART fitter
//! - `train`: labels, train/test split and accuracy
//! - `dot`: Graphviz export of a trained tree

pub mod dot;
pub mod encode;
pub mod store;
pub mod train;
pub mod tree;

pub use encode::{EncodeError, Feature, FeatureSpace};
pub use store::{Sample, SampleStore, StoreError};
pub use train::{train, TargetConstraint, TrainError, TrainedModel};
pub use tree::{DecisionTree, TreeError, TreeParams};
