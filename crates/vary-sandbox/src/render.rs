use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use vary_ir::types::Configuration;

use crate::config::RenderConfig;
use crate::inject::{self, InjectError};
use crate::process::{run_with_timeout, ProcessError};
use crate::workspace::RenderWorkspace;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render timed out: {0}")]
    Timeout(ProcessError),

    #[error("process error: {0}")]
    Process(ProcessError),

    #[error("source instrumentation failed: {0}")]
    Inject(#[from] InjectError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("layout extractor exited with {status}")]
    Failed { status: String },

    #[error("invalid layout output: {0}")]
    Layout(#[from] serde_json::Error),
}

impl From<ProcessError> for RenderError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Timeout { .. } => RenderError::Timeout(err),
            other => RenderError::Process(other),
        }
    }
}

impl RenderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RenderError::Timeout(_))
    }
}

/// Axis-aligned rectangle in points, `y` growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl From<[f64; 4]> for Rect {
    fn from([x0, y0, x1, y1]: [f64; 4]) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

impl From<Rect> for [f64; 4] {
    fn from(r: Rect) -> Self {
        [r.x0, r.y0, r.x1, r.y1]
    }
}

/// Layout of one rendered page: its rectangle, the crop-box origin and the
/// bounding boxes of its text blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub rect: Rect,
    #[serde(default)]
    pub crop_origin: [f64; 2],
    #[serde(default)]
    pub blocks: Vec<Rect>,
}

impl PageGeometry {
    /// Vertical extent of the crop rectangle, displaced by the crop origin.
    pub fn crop_extent(&self) -> (f64, f64) {
        let dy = self.crop_origin[1];
        (self.rect.y0 + dy, self.rect.y1 + dy)
    }

    /// Vertical extents of the text blocks, displaced by the crop origin.
    pub fn block_extents(&self) -> Vec<(f64, f64)> {
        let dy = self.crop_origin[1];
        self.blocks.iter().map(|b| (b.y0 + dy, b.y1 + dy)).collect()
    }
}

/// What a render produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub page_count: u32,
    pub pages: Vec<PageGeometry>,
    /// Remaining space written by the in-document indicator, when present.
    #[serde(default)]
    pub reported_space: Option<f64>,
}

impl RenderedDocument {
    pub fn last_page(&self) -> Option<&PageGeometry> {
        self.pages.last()
    }
}

/// JSON printed by the layout extractor.
#[derive(Debug, Deserialize)]
struct LayoutOutput {
    #[serde(default)]
    page_count: Option<u32>,
    pages: Vec<PageGeometry>,
}

/// Turns a configuration into a rendered document.
///
/// Abstracted behind a trait so generation can run against the real
/// compiler or against a scripted renderer in tests.
pub trait Renderer {
    fn render(&self, config: &Configuration) -> Result<RenderedDocument, RenderError>;
}

/// Renderer driving external commands on a prepared scratch copy.
pub struct CommandRenderer {
    config: RenderConfig,
    workspace: RenderWorkspace,
    /// Renders share the scratch directory and run one at a time.
    lock: Mutex<()>,
}

impl CommandRenderer {
    /// Copy `source`, instrument the main file and pre-generate the bibliography.
    pub fn prepare(source: &Path, config: RenderConfig) -> Result<Self, RenderError> {
        let workspace = RenderWorkspace::copy_from(source)?;
        let main_tex = workspace.file(&config.tex_file());

        inject::write_macros(workspace.path())?;
        inject::write_values(workspace.path(), &Configuration::new())?;
        inject::ensure_value_includes(&main_tex)?;
        inject::inject_space_indicator(&main_tex)?;

        let renderer = Self {
            config,
            workspace,
            lock: Mutex::new(()),
        };
        if renderer.config.bibliography {
            renderer.generate_bibliography()?;
        }
        Ok(renderer)
    }

    /// Draft compile to produce the `.aux`, then run the bibliography tool.
    /// A timeout here only degrades references, so it is logged and ignored.
    fn generate_bibliography(&self) -> Result<(), RenderError> {
        let cwd = self.workspace.path();
        let timeout = self.config.timeout();
        let tex = self.config.tex_file();
        let aux = self.config.aux_file();

        let draft = run_with_timeout(&self.config.compile_command, &["-draftmode", tex.as_str()], cwd, timeout)
            .and_then(|_| run_with_timeout(&self.config.bibliography_command, &[aux.as_str()], cwd, timeout));
        match draft {
            Ok(_) => Ok(()),
            Err(ProcessError::Timeout { .. }) => {
                log::warn!("bibliography generation timed out, continuing without it");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    /// Path of the PDF produced by the last render.
    pub fn pdf_path(&self) -> PathBuf {
        self.workspace.file(&self.config.pdf_file())
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    fn extract_layout(&self) -> Result<LayoutOutput, RenderError> {
        let pdf = self.pdf_path();
        let pdf = pdf.to_string_lossy();
        let output = run_with_timeout(
            &self.config.layout_command,
            &[&*pdf],
            self.workspace.path(),
            self.config.timeout(),
        )?;
        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status.to_string(),
            });
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

impl Renderer for CommandRenderer {
    fn render(&self, config: &Configuration) -> Result<RenderedDocument, RenderError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let cwd = self.workspace.path();
        let tex = self.config.tex_file();

        // A stale indicator from the previous render must not be picked up.
        let space_file = self.workspace.file(inject::SPACE_FILE);
        if space_file.exists() {
            std::fs::remove_file(&space_file)?;
        }

        inject::write_values(cwd, config)?;
        for pass in 0..self.config.compile_passes.max(1) {
            let out = run_with_timeout(&self.config.compile_command, &[tex.as_str()], cwd, self.config.timeout())?;
            if !out.status.success() {
                log::debug!("compile pass {pass} exited with {}", out.status);
            }
        }

        let layout = self.extract_layout()?;
        let reported_space = match inject::read_reported_space(cwd) {
            Ok(space) => Some(space),
            Err(err) => {
                log::debug!("no reported space: {err}");
                None
            }
        };

        Ok(RenderedDocument {
            page_count: layout.page_count.unwrap_or(layout.pages.len() as u32),
            pages: layout.pages,
            reported_space,
        })
    }
}
