//! Partial-evidence inference over a trained tree and the `vary` pipeline
//! (generate, train, predict) around it.

pub mod cli;
pub mod config;
pub mod infer;
pub mod report;
pub mod session;

pub use config::{ConfigError, VaryConfig};
pub use infer::{predict, resolve, InferenceContext, InferenceError};
pub use report::InferenceReport;
pub use session::{Session, SessionError};
