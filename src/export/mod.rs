//! Export module - Render tree, rasterization and file output

pub mod document;
mod pdf;
mod pipeline;
mod raster;
mod resources;

pub use document::{Document, Node, NodeKind};
pub use pipeline::{ExportError, ExportFormat, ExportPipeline, ExportRequest};
