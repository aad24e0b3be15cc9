//! Scene rasterization: paints a laid-out render subtree to a bitmap or an
//! SVG document.

use super::document::{Document, ImageState, LayoutBox, NodeId, NodeKind, CHAR_WIDTH, LINE_HEIGHT};
use super::pipeline::ExportError;
use crate::charts::{StaticChartRenderer, VisualizationDispatcher};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{imageops, DynamicImage, ImageFormat, RgbImage, RgbaImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::io::Cursor;
use std::sync::Arc;

const FONT: &str = "sans-serif";
const BLOCK_BORDER: RGBColor = RGBColor(225, 228, 232);
const BADGE_BG: RGBColor = RGBColor(44, 62, 80);
const TEXT: RGBColor = RGBColor(51, 51, 51);

/// Turns a render subtree into pixels or vector markup.
pub trait Rasterizer {
    /// Paint `root` at `pixel_ratio` times its layout size on white.
    fn raster(&self, doc: &Document, root: NodeId, pixel_ratio: u32)
        -> Result<RgbImage, ExportError>;

    /// SVG document at the layout size of `root`.
    fn vector(&self, doc: &Document, root: NodeId) -> Result<String, ExportError>;
}

/// Default rasterizer drawing with plotters.
#[derive(Debug, Default, Clone, Copy)]
pub struct SceneRasterizer;

fn raster_err<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> ExportError {
    ExportError::Rasterize(e.to_string())
}

/// Greedy word wrap to at most `per_line` characters.
pub fn wrap_text(text: &str, per_line: usize) -> Vec<String> {
    let per_line = per_line.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
        if needed > per_line && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Image placed in the final output, in output pixels.
struct Placed {
    pixels: Arc<RgbaImage>,
    x: i64,
    y: i64,
    width: u32,
    height: u32,
}

impl SceneRasterizer {
    fn paint<DB: DrawingBackend>(
        doc: &Document,
        boxes: &[LayoutBox],
        area: &DrawingArea<DB, Shift>,
        r: u32,
    ) -> Result<Vec<Placed>, ExportError> {
        let ri = r as i32;
        let mut images = Vec::new();

        for b in boxes {
            let Some(node) = doc.get(b.node) else { continue };
            let (x, y) = (b.x * ri, b.y * ri);
            let (w, h) = ((b.width * r) as i32, (b.height * r) as i32);

            match &node.kind {
                NodeKind::Block => {
                    area.draw(&Rectangle::new(
                        [(x, y), (x + w - 1, y + h - 1)],
                        BLOCK_BORDER.stroke_width(r),
                    ))
                    .map_err(raster_err)?;
                }
                NodeKind::Heading(text) => {
                    area.draw(&Text::new(
                        text.clone(),
                        (x, y + h / 2),
                        TextStyle::from((FONT, (20 * r) as f64).into_font().style(FontStyle::Bold))
                            .color(&BLACK)
                            .pos(Pos::new(HPos::Left, VPos::Center)),
                    ))
                    .map_err(raster_err)?;
                }
                NodeKind::Text(text) => {
                    let per_line = (b.width / CHAR_WIDTH) as usize;
                    for (i, line) in wrap_text(text, per_line).into_iter().enumerate() {
                        area.draw(&Text::new(
                            line,
                            (x, y + (i as u32 * LINE_HEIGHT * r) as i32 + 2 * ri),
                            TextStyle::from((FONT, (13 * r) as f64)).color(&TEXT),
                        ))
                        .map_err(raster_err)?;
                    }
                }
                NodeKind::Visualization { data, options } => {
                    let sub = area.clone().shrink((x, y), (w, h));
                    let view = VisualizationDispatcher::dispatch(data, options);
                    StaticChartRenderer::draw_view(&sub, &view, r)
                        .map_err(|e| ExportError::Rasterize(e.to_string()))?;
                }
                NodeKind::Badge(label) => {
                    area.draw(&Rectangle::new(
                        [(x, y), (x + w, y + h)],
                        BADGE_BG.mix(0.85).filled(),
                    ))
                    .map_err(raster_err)?;
                    area.draw(&Text::new(
                        label.clone(),
                        (x + w / 2, y + h / 2),
                        TextStyle::from((FONT, (12 * r) as f64))
                            .color(&WHITE)
                            .pos(Pos::new(HPos::Center, VPos::Center)),
                    ))
                    .map_err(raster_err)?;
                }
                NodeKind::Image {
                    state: ImageState::Ready(pixels),
                    width,
                    height,
                    ..
                } => {
                    let draw_w = (*width).min(b.width).max(1);
                    let draw_h = if *width > 0 {
                        (*height as u64 * draw_w as u64 / *width as u64).max(1) as u32
                    } else {
                        b.height.max(1)
                    };
                    images.push(Placed {
                        pixels: Arc::clone(pixels),
                        x: x as i64,
                        y: y as i64,
                        width: draw_w * r,
                        height: draw_h * r,
                    });
                }
                // Pending and failed images stay blank; overlays never reach an export.
                NodeKind::Image { .. }
                | NodeKind::Overlay(_)
                | NodeKind::Body
                | NodeKind::Container => {}
            }
        }

        Ok(images)
    }

    fn boxes(doc: &Document, root: NodeId) -> Result<(Vec<LayoutBox>, u32, u32), ExportError> {
        let boxes = doc.layout(root);
        let (width, height) = boxes
            .first()
            .map(|b| (b.width, b.height))
            .ok_or_else(|| ExportError::Rasterize(format!("node {} is not in the document", root)))?;
        if width == 0 || height == 0 {
            return Err(ExportError::Rasterize(format!(
                "element has an empty layout ({}x{})",
                width, height
            )));
        }
        Ok((boxes, width, height))
    }
}

impl Rasterizer for SceneRasterizer {
    fn raster(
        &self,
        doc: &Document,
        root: NodeId,
        pixel_ratio: u32,
    ) -> Result<RgbImage, ExportError> {
        let r = pixel_ratio.max(1);
        let (boxes, width, height) = Self::boxes(doc, root)?;
        let (w, h) = (width * r, height * r);

        let mut buffer = vec![255u8; (w as usize) * (h as usize) * 3];
        let images = {
            let root_area = BitMapBackend::with_buffer(&mut buffer, (w, h)).into_drawing_area();
            root_area.fill(&WHITE).map_err(raster_err)?;
            let images = Self::paint(doc, &boxes, &root_area, r)?;
            root_area.present().map_err(raster_err)?;
            images
        };

        let canvas = RgbImage::from_raw(w, h, buffer)
            .ok_or_else(|| ExportError::Rasterize("bitmap buffer size mismatch".into()))?;
        let mut canvas = DynamicImage::ImageRgb8(canvas).to_rgba8();
        for placed in images {
            let scaled = imageops::resize(
                placed.pixels.as_ref(),
                placed.width,
                placed.height,
                imageops::FilterType::Triangle,
            );
            imageops::overlay(&mut canvas, &scaled, placed.x, placed.y);
        }
        Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
    }

    fn vector(&self, doc: &Document, root: NodeId) -> Result<String, ExportError> {
        let (boxes, width, height) = Self::boxes(doc, root)?;

        let mut svg = String::new();
        let images = {
            let root_area = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
            root_area.fill(&WHITE).map_err(raster_err)?;
            let images = Self::paint(doc, &boxes, &root_area, 1)?;
            root_area.present().map_err(raster_err)?;
            images
        };

        if images.is_empty() {
            return Ok(svg);
        }

        let mut embedded = String::new();
        for placed in images {
            let mut png = Vec::new();
            placed
                .pixels
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
            embedded.push_str(&format!(
                "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" href=\"data:image/png;base64,{}\"/>\n",
                placed.x,
                placed.y,
                placed.width,
                placed.height,
                BASE64.encode(&png)
            ));
        }
        match svg.rfind("</svg>") {
            Some(end) => svg.insert_str(end, &embedded),
            None => svg.push_str(&embedded),
        }
        Ok(svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::dispatcher::tests::chart_data;
    use crate::charts::DisplayOptions;
    use crate::export::document::Node;
    use image::Rgba;
    use std::path::PathBuf;

    fn card(doc: &mut Document) -> NodeId {
        let body = doc.body();
        let card = doc.append(body, Node::new(NodeKind::Block).with_id("card").with_width(400));
        doc.append(card, Node::new(NodeKind::Heading("Temperature".into())));
        doc.append(
            card,
            Node::new(NodeKind::Visualization {
                data: Box::new(chart_data("chart-1")),
                options: DisplayOptions::default().with_height(240.0),
            }),
        );
        card
    }

    #[test]
    fn raster_scales_by_pixel_ratio() {
        let mut doc = Document::new(800);
        let root = card(&mut doc);
        let (w, h) = doc.layout_size(root);
        let img = SceneRasterizer.raster(&doc, root, 2).unwrap();
        assert_eq!(img.dimensions(), (w * 2, h * 2));
        // White background in the padding
        assert_eq!(img.get_pixel(4, 4).0, [255, 255, 255]);
    }

    #[test]
    fn vector_uses_layout_size_and_embeds_images() {
        let mut doc = Document::new(800);
        let root = card(&mut doc);
        doc.append(
            root,
            Node::new(NodeKind::Image {
                source: PathBuf::from("logo.png"),
                width: 8,
                height: 8,
                state: ImageState::Ready(Arc::new(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])))),
            }),
        );
        let (w, h) = doc.layout_size(root);
        let svg = SceneRasterizer.vector(&doc, root).unwrap();
        assert!(svg.contains(&format!("width=\"{}\"", w)));
        assert!(svg.contains(&format!("height=\"{}\"", h)));
        assert!(svg.contains("data:image/png;base64,"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn ready_images_are_composited() {
        let mut doc = Document::new(100);
        let body = doc.body();
        let block = doc.append(body, Node::new(NodeKind::Block).with_width(100));
        doc.append(
            block,
            Node::new(NodeKind::Image {
                source: PathBuf::from("red.png"),
                width: 20,
                height: 20,
                state: ImageState::Ready(Arc::new(RgbaImage::from_pixel(20, 20, Rgba([255, 0, 0, 255])))),
            }),
        );
        let img = SceneRasterizer.raster(&doc, block, 1).unwrap();
        assert_eq!(img.get_pixel(20, 20).0, [255, 0, 0]);
    }

    #[test]
    fn empty_layout_is_an_error() {
        let mut doc = Document::new(100);
        let body = doc.body();
        let empty = doc.append(body, Node::new(NodeKind::Overlay("".into())));
        assert!(matches!(
            SceneRasterizer.raster(&doc, empty, 2),
            Err(ExportError::Rasterize(_))
        ));
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text("rainfall totals fell sharply", 14),
            vec!["rainfall", "totals fell", "sharply"]
        );
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }
}
