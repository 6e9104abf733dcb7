//! Tool configuration.
//!
//! Every field has a default so a partial JSON file is enough; command-line
//! options override what the file sets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vary_explore::space::SpaceSource;
use vary_sandbox::config::RenderConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaryConfig {
    /// Directory holding the document sources.
    pub source_dir: PathBuf,
    /// Variables file, relative to `source_dir`.
    pub schema_file: PathBuf,
    /// Where the sample table, the tree and rendered PDFs go.
    pub output_dir: PathBuf,
    /// Configurations rendered per `generate` run.
    pub generations: usize,
    /// Start a new sample table instead of extending the existing one.
    pub reset: bool,
    /// Spread renders over a thread pool.
    pub parallel: bool,
    pub space_source: SpaceSource,
    /// Acceptable page count; required to train.
    pub max_pages: Option<u32>,
    /// Percentage of the samples used for training, the rest measures accuracy.
    pub train_size: f64,
    /// Graphviz executable used to draw the tree; `None` writes only the DOT file.
    pub dot_command: Option<String>,
    pub render: RenderConfig,
}

impl Default for VaryConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("source"),
            schema_file: PathBuf::from("variables.json"),
            output_dir: PathBuf::from("results"),
            generations: 10,
            reset: false,
            parallel: false,
            space_source: SpaceSource::default(),
            max_pages: None,
            train_size: 100.0,
            dot_command: Some("dot".to_string()),
            render: RenderConfig::default(),
        }
    }
}

impl VaryConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1.0..=100.0).contains(&self.train_size) {
            return Err(ConfigError::Invalid(format!(
                "train_size must be within 1..=100, got {}",
                self.train_size
            )));
        }
        if self.render.timeout_secs == 0 {
            return Err(ConfigError::Invalid("render timeout must be positive".to_string()));
        }
        if self.render.compile_command.is_empty() || self.render.layout_command.is_empty() {
            return Err(ConfigError::Invalid("render commands must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn schema_path(&self) -> PathBuf {
        self.source_dir.join(&self.schema_file)
    }

    pub fn samples_path(&self) -> PathBuf {
        self.output_dir.join("result.csv")
    }

    pub fn main_tex_path(&self) -> PathBuf {
        self.source_dir.join(self.render.tex_file())
    }
}
