//! Export Pipeline
//! Clones a rendered element off-screen, stamps the watermark, waits for its
//! images and writes PNG, SVG or PDF.
//!
//! Steps for one invocation:
//! 1. locate the element by id
//! 2. show a loading overlay on the original
//! 3. deep-clone the element
//! 4. mount the clone in a fresh off-screen container under the body
//! 5. add a watermark badge unless the clone already carries one
//! 6. wait until every image in the clone has loaded or failed
//! 7. rasterize / vectorize and write the file
//! 8. remove the container and the overlay, whatever happened above

use super::document::{Document, ImageState, Node, NodeId, NodeKind, Position};
use super::pdf::PdfWriter;
use super::raster::{Rasterizer, SceneRasterizer};
use super::resources::ResourceLoader;
use crate::config::ExportConfig;
use image::{ImageFormat, RgbImage};
use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

/// Marks a node as the export watermark.
pub const WATERMARK_ATTR: &str = "data-watermark";
/// Marks the loading overlay shown on an element being exported.
pub const LOADING_ATTR: &str = "data-export-loading";
/// Marks an off-screen export container; the value is the exported element id.
pub const CONTAINER_ATTR: &str = "data-export-container";
/// Pixel density for raster output.
pub const EXPORT_PIXEL_RATIO: u32 = 2;
const OFFSCREEN: Position = Position::Offscreen {
    left: -10_000,
    top: 0,
};
const WATERMARK_INSET: u32 = 12;
const LOGO_SIZE: u32 = 32;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No element with id '{0}'")]
    TargetNotFound(String),
    #[error("Rasterization failed: {0}")]
    Rasterize(String),
    #[error("Encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("PDF assembly failed: {0}")]
    Pdf(String),
    #[error("Export filename '{0}' must be a plain file name")]
    InvalidFilename(String),
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Png,
    Svg,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Png, ExportFormat::Svg, ExportFormat::Pdf];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Png => "PNG",
            ExportFormat::Svg => "SVG",
            ExportFormat::Pdf => "PDF",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub element_id: String,
    pub format: ExportFormat,
    pub filename: String,
}

impl ExportRequest {
    /// Request named after the element: `chart-1` as PNG is `chart-1.png`.
    pub fn new(element_id: impl Into<String>, format: ExportFormat) -> Self {
        let element_id = element_id.into();
        let stem: String = element_id
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        Self {
            filename: format!("{}.{}", stem, format.extension()),
            element_id,
            format,
        }
    }
}

/// Watermark stamped on clones that lack one.
#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub label: String,
    pub logo: Option<PathBuf>,
}

impl Watermark {
    fn node(&self) -> Node {
        let kind = match &self.logo {
            Some(path) => NodeKind::Image {
                source: path.clone(),
                width: LOGO_SIZE,
                height: LOGO_SIZE,
                state: ImageState::Pending,
            },
            None => NodeKind::Badge(self.label.clone()),
        };
        Node::new(kind)
            .with_attribute(WATERMARK_ATTR, "true")
            .with_position(Position::Fixed {
                right: WATERMARK_INSET,
                bottom: WATERMARK_INSET,
            })
    }
}

/// Owns the temporary nodes of one export. Dropping it removes them, so
/// cleanup also happens on early returns and unwinding.
struct ExportScope<'d> {
    doc: &'d mut Document,
    container: Option<NodeId>,
    overlay: Option<NodeId>,
}

impl<'d> ExportScope<'d> {
    fn new(doc: &'d mut Document) -> Self {
        Self {
            doc,
            container: None,
            overlay: None,
        }
    }
}

impl Drop for ExportScope<'_> {
    fn drop(&mut self) {
        if let Some(container) = self.container.take() {
            self.doc.remove(container);
        }
        if let Some(overlay) = self.overlay.take() {
            self.doc.remove(overlay);
        }
        debug!("Export scope cleaned up");
    }
}

pub struct ExportPipeline<R: Rasterizer = SceneRasterizer> {
    rasterizer: R,
    loader: ResourceLoader,
    output_dir: PathBuf,
    container_width: u32,
    watermark: Watermark,
}

impl ExportPipeline<SceneRasterizer> {
    pub fn new(config: &ExportConfig) -> Self {
        Self::with_rasterizer(SceneRasterizer, config)
    }
}

impl<R: Rasterizer> ExportPipeline<R> {
    pub fn with_rasterizer(rasterizer: R, config: &ExportConfig) -> Self {
        Self {
            rasterizer,
            loader: ResourceLoader::new(),
            output_dir: config.output_dir.clone(),
            container_width: config.container_width,
            watermark: Watermark {
                label: config.watermark_label.clone(),
                logo: config.watermark_logo.clone(),
            },
        }
    }

    /// Export one element. Returns the path of the written file.
    pub fn export(
        &mut self,
        doc: &mut Document,
        request: &ExportRequest,
    ) -> Result<PathBuf, ExportError> {
        info!(
            "Exporting '{}' as {} to {}",
            request.element_id, request.format, request.filename
        );
        let result = self.run(doc, request);
        match &result {
            Ok(path) => info!("Export saved: {}", path.display()),
            Err(e) => error!("Export of '{}' failed: {}", request.element_id, e),
        }
        result
    }

    /// Export several elements in sequence; one failure does not stop the rest.
    pub fn export_all(
        &mut self,
        doc: &mut Document,
        element_ids: &[&str],
        format: ExportFormat,
    ) -> Vec<(String, Result<PathBuf, ExportError>)> {
        element_ids
            .iter()
            .map(|id| {
                let request = ExportRequest::new(*id, format);
                (id.to_string(), self.export(doc, &request))
            })
            .collect()
    }

    fn run(&mut self, doc: &mut Document, request: &ExportRequest) -> Result<PathBuf, ExportError> {
        let target = doc
            .get_element_by_id(&request.element_id)
            .ok_or_else(|| ExportError::TargetNotFound(request.element_id.clone()))?;

        let mut scope = ExportScope::new(doc);

        let overlay = scope.doc.append(
            target,
            Node::new(NodeKind::Overlay("Exporting…".into()))
                .with_attribute(LOADING_ATTR, "true")
                .with_position(Position::Cover),
        );
        scope.overlay = Some(overlay);

        let clone = scope
            .doc
            .deep_clone(target)
            .ok_or_else(|| ExportError::TargetNotFound(request.element_id.clone()))?;
        for loading in scope.doc.query_attribute_all(clone, LOADING_ATTR) {
            scope.doc.remove(loading);
        }

        let body = scope.doc.body();
        let container = scope.doc.append(
            body,
            Node::new(NodeKind::Container)
                .with_id(format!("export-container-{}", clone))
                .with_attribute(CONTAINER_ATTR, request.element_id.as_str())
                .with_position(OFFSCREEN)
                .with_width(self.container_width),
        );
        scope.container = Some(container);
        scope.doc.append_child(container, clone);
        debug!("Mounted clone {} in container {}", clone, container);

        if scope.doc.query_attribute(clone, WATERMARK_ATTR).is_none() {
            scope.doc.append(clone, self.watermark.node());
            debug!("Watermark added");
        }

        let report = self.loader.wait_for_images(scope.doc, container);
        debug!("Images ready: {} loaded, {} failed", report.loaded, report.failed);

        let bytes = match request.format {
            ExportFormat::Png => {
                let image = self.rasterizer.raster(scope.doc, container, EXPORT_PIXEL_RATIO)?;
                encode_png(&image)?
            }
            ExportFormat::Svg => self.rasterizer.vector(scope.doc, container)?.into_bytes(),
            ExportFormat::Pdf => {
                let image = self.rasterizer.raster(scope.doc, container, EXPORT_PIXEL_RATIO)?;
                let title = document_title(scope.doc, clone).unwrap_or(request.element_id.as_str());
                PdfWriter::single_image_page(&image, title)?
            }
        };

        write_atomic(&self.output_dir, &request.filename, &bytes)
    }
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// First heading inside the exported element.
fn document_title(doc: &Document, root: NodeId) -> Option<&str> {
    doc.descendants(root).into_iter().find_map(|id| match doc.get(id).map(|n| &n.kind) {
        Some(NodeKind::Heading(text)) => Some(text.as_str()),
        Some(NodeKind::Visualization { data, .. }) => Some(data.title.as_str()),
        _ => None,
    })
}

/// Write through a sibling `.part` file so a failed export leaves nothing behind.
fn write_atomic(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    let mut components = Path::new(filename).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        return Err(ExportError::InvalidFilename(filename.to_string()));
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    let partial = dir.join(format!("{}.part", filename));
    if let Err(e) = fs::write(&partial, bytes).and_then(|_| fs::rename(&partial, &path)) {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }
    Ok(path)
}
