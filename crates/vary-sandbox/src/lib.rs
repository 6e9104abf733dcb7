//! Rendering side of the exploration: prepares a scratch copy of the
//! document, materializes configurations into it and runs the external
//! compiler and layout extractor under a deadline.

pub mod config;
pub mod inject;
pub mod process;
pub mod render;
pub mod workspace;

pub use config::RenderConfig;
pub use render::{CommandRenderer, PageGeometry, Rect, RenderError, RenderedDocument, Renderer};
