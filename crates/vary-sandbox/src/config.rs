//! Render configuration: external commands and their time bound.
use serde::{Deserialize, Serialize};

/// Configuration of the external renderer.
///
/// Every command is bounded by `timeout_secs`; a command still running at
/// the deadline is killed and the render reported as timed out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Main document file name, without the `.tex` extension.
    pub main_file: String,
    /// Deadline for each subprocess, in seconds (default: 15).
    pub timeout_secs: u64,
    /// Compiler invocation; the main `.tex` file is appended.
    pub compile_command: Vec<String>,
    /// Number of compile passes per render (references need two).
    pub compile_passes: u32,
    /// Pre-generate the bibliography once when the workspace is prepared.
    pub bibliography: bool,
    /// Bibliography invocation; the `.aux` file is appended.
    pub bibliography_command: Vec<String>,
    /// Layout extractor; the PDF path is appended. Must print the page
    /// geometry JSON on stdout.
    pub layout_command: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            main_file: "main".to_string(),
            timeout_secs: 15,
            compile_command: vec!["pdflatex".to_string(), "-interaction=batchmode".to_string()],
            compile_passes: 2,
            bibliography: true,
            bibliography_command: vec!["bibtex".to_string()],
            layout_command: vec!["vary-layout".to_string()],
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub fn tex_file(&self) -> String {
        format!("{}.tex", self.main_file)
    }

    pub fn pdf_file(&self) -> String {
        format!("{}.pdf", self.main_file)
    }

    pub fn aux_file(&self) -> String {
        format!("{}.aux", self.main_file)
    }
}
