//! PDF Page Writer
//! Builds a single-page A4 document holding one raster image.
//!
//! The image is stored as JPEG and embedded with the DCT filter; placement
//! comes from `PageLayout::fit`.

use super::pipeline::ExportError;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use printpdf::{
    ColorBits, ColorSpace, Image, ImageFilter, ImageTransform, ImageXObject, Mm, PdfDocument, Px,
};

/// A4 short and long edge (mm)
pub const A4_SHORT_MM: f64 = 210.0;
pub const A4_LONG_MM: f64 = 297.0;
/// Page margin on every side (mm)
pub const MARGIN_MM: f64 = 10.0;
const MM_PER_INCH: f64 = 25.4;
const JPEG_QUALITY: u8 = 92;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Landscape when strictly wider than tall.
    pub fn for_size(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Page size (width, height) in mm.
    pub fn page_mm(&self) -> (f64, f64) {
        match self {
            Orientation::Portrait => (A4_SHORT_MM, A4_LONG_MM),
            Orientation::Landscape => (A4_LONG_MM, A4_SHORT_MM),
        }
    }
}

/// Placement of the image on the page, all in mm from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub orientation: Orientation,
    pub page_width: f64,
    pub page_height: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageLayout {
    /// Scale an image of `width` x `height` pixels to fit inside the margins,
    /// keeping its aspect ratio. Centered horizontally, top-aligned.
    pub fn fit(width: u32, height: u32) -> Self {
        let orientation = Orientation::for_size(width, height);
        let (page_width, page_height) = orientation.page_mm();
        let max_w = page_width - 2.0 * MARGIN_MM;
        let max_h = page_height - 2.0 * MARGIN_MM;

        let (w_px, h_px) = (width.max(1) as f64, height.max(1) as f64);
        let scale = (max_w / w_px).min(max_h / h_px);
        let (w, h) = (w_px * scale, h_px * scale);

        Self {
            orientation,
            page_width,
            page_height,
            x: (page_width - w) / 2.0,
            y: MARGIN_MM,
            width: w,
            height: h,
        }
    }
}

pub struct PdfWriter;

impl PdfWriter {
    /// Encode `image` as the only content of a one-page PDF.
    pub fn single_image_page(image: &RgbImage, title: &str) -> Result<Vec<u8>, ExportError> {
        let layout = PageLayout::fit(image.width(), image.height());

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(image)?;

        let doc = PdfDocument::empty(title);
        let (page, layer) = doc.add_page(
            Mm(layout.page_width as f32),
            Mm(layout.page_height as f32),
            "Export",
        );
        let layer = doc.get_page(page).get_layer(layer);

        let xobject = ImageXObject {
            width: Px(image.width() as usize),
            height: Px(image.height() as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: jpeg,
            image_filter: Some(ImageFilter::DCT),
            smask: None,
            clipping_bbox: None,
        };

        // Native size at this density equals the fitted width; PDF origin is bottom-left
        let dpi = image.width().max(1) as f64 * MM_PER_INCH / layout.width;
        Image::from(xobject).add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(layout.x as f32)),
                translate_y: Some(Mm((layout.page_height - layout.y - layout.height) as f32)),
                dpi: Some(dpi as f32),
                ..Default::default()
            },
        );

        doc.save_to_bytes()
            .map_err(|e| ExportError::Pdf(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    const PT_PER_MM: f64 = 72.0 / MM_PER_INCH;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    /// Page size in points from the first `/MediaBox`.
    pub(crate) fn media_box(pdf: &[u8]) -> (f64, f64) {
        let text = String::from_utf8_lossy(pdf);
        let at = text.find("/MediaBox").unwrap();
        let open = at + text[at..].find('[').unwrap() + 1;
        let close = open + text[open..].find(']').unwrap();
        let values: Vec<f64> = text[open..close]
            .split_whitespace()
            .map(|p| p.parse().unwrap())
            .collect();
        (values[2] - values[0], values[3] - values[1])
    }

    /// Title stored as UTF-8 or UTF-16BE, literal or hex.
    pub(crate) fn contains_title(pdf: &[u8], title: &str) -> bool {
        let utf8 = title.as_bytes().to_vec();
        let utf16: Vec<u8> = title.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        let hex = |bytes: &[u8]| bytes.iter().map(|b| format!("{:02X}", b)).collect::<String>();
        [utf8.clone(), utf16.clone(), hex(&utf8).into_bytes(), hex(&utf16).into_bytes()]
            .iter()
            .any(|form| contains(pdf, form) || contains(&pdf.to_ascii_uppercase(), form))
    }

    #[test]
    fn wide_image_gives_landscape_page() {
        let pdf = PdfWriter::single_image_page(&RgbImage::new(300, 100), "Rainfall").unwrap();
        let (w, h) = media_box(&pdf);
        assert!(w > h);
        assert!((w - A4_LONG_MM * PT_PER_MM).abs() < 0.5);
    }

    #[test]
    fn tall_image_gives_portrait_page() {
        let pdf = PdfWriter::single_image_page(&RgbImage::new(100, 300), "Rainfall").unwrap();
        let (w, h) = media_box(&pdf);
        assert!(w < h);
    }

    #[test]
    fn document_embeds_jpeg() {
        let pdf = PdfWriter::single_image_page(&RgbImage::new(40, 20), "Sea (level)").unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert!(contains(&pdf, b"DCTDecode"));
        assert!(String::from_utf8_lossy(&pdf).trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn non_ascii_title_survives() {
        let title = "Température à Côte d'Ivoire";
        let pdf = PdfWriter::single_image_page(&RgbImage::new(20, 10), title).unwrap();
        assert!(contains_title(&pdf, title));
        assert!(!contains(&pdf, b"Temp?rature"));
    }

    #[test]
    fn square_images_are_portrait() {
        assert_eq!(Orientation::for_size(500, 500), Orientation::Portrait);
    }

    proptest! {
        #[test]
        fn orientation_follows_aspect(w in 1u32..4000, h in 1u32..4000) {
            let layout = PageLayout::fit(w, h);
            if w > h {
                prop_assert_eq!(layout.orientation, Orientation::Landscape);
                prop_assert!(layout.page_width > layout.page_height);
            } else {
                prop_assert_eq!(layout.orientation, Orientation::Portrait);
                prop_assert!(layout.page_width < layout.page_height);
            }
        }

        #[test]
        fn image_fits_inside_margins(w in 1u32..4000, h in 1u32..4000) {
            let l = PageLayout::fit(w, h);
            prop_assert!(l.x >= MARGIN_MM - 1e-9);
            prop_assert!(l.x + l.width <= l.page_width - MARGIN_MM + 1e-9);
            prop_assert!(l.y + l.height <= l.page_height - MARGIN_MM + 1e-9);
            let ratio = w as f64 / h as f64;
            prop_assert!((l.width / l.height - ratio).abs() / ratio < 1e-9);
        }
    }
}
