use std::sync::Arc;

use hayro_interpret::font::Glyph;
use hayro_interpret::hayro_syntax::Pdf;
use hayro_interpret::util::PageExt;
use hayro_interpret::{
    interpret_page, BlendMode, ClipPath, Context, Device, GlyphDrawMode, Image, InterpreterSettings,
    Paint, PathDrawMode, SoftMask,
};
use kurbo::{Affine, Rect, Shape};
use tracing::debug;

use crate::application::PdfTextExtractor;
use crate::domain::DomainError;

/// Separator placed between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Minimum vertical overlap, relative to the smaller glyph height, for two
/// glyphs to share a line.
const SAME_LINE_OVERLAP: f64 = 0.5;
/// Horizontal gap, relative to the glyph height, that reads as a word break.
const WORD_GAP: f64 = 0.25;

/// Extracts the text layer of a PDF with `hayro-interpret`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HayroPdfExtractor;

impl HayroPdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PdfTextExtractor for HayroPdfExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String, DomainError> {
        let pdf = Pdf::new(Arc::new(data.to_vec()))
            .map_err(|e| DomainError::parse(format!("invalid PDF document: {e:?}")))?;

        let settings = InterpreterSettings::default();
        let mut pages = Vec::new();
        for page in pdf.pages().iter() {
            let (width, height) = page.render_dimensions();
            let bbox = Rect::new(0.0, 0.0, width as f64, height as f64);
            let mut ctx = Context::new(
                page.initial_transform(true),
                bbox,
                page.xref(),
                settings.clone(),
            );
            let mut device = GlyphCollector::default();
            interpret_page(page, &mut ctx, &mut device);
            pages.push(device.text());
        }

        debug!("Extracted text from {} PDF pages", pages.len());
        Ok(pages.join(PAGE_SEPARATOR))
    }
}

#[derive(Debug, Clone)]
struct PlacedChar {
    ch: Option<char>,
    /// Page-space bounds; unknown for Type3 glyphs.
    bbox: Option<Rect>,
}

/// Records glyphs in drawing order and ignores everything else.
#[derive(Debug, Default)]
struct GlyphCollector {
    chars: Vec<PlacedChar>,
}

impl GlyphCollector {
    /// Rebuilds text from glyph geometry, inferring spaces from wide gaps and
    /// newlines from glyphs that leave the current line.
    fn text(&self) -> String {
        let mut out = String::new();
        let mut last_bbox: Option<Rect> = None;

        for glyph in &self.chars {
            if let (Some(prev), Some(cur)) = (last_bbox, glyph.bbox) {
                let last = out.chars().last();
                if !same_line(prev, cur) {
                    if last.is_some_and(|c| c != '\n') {
                        out.push('\n');
                    }
                } else {
                    let gap = cur.x0 - prev.x1;
                    let threshold = WORD_GAP * 0.5 * (prev.height() + cur.height());
                    if gap > threshold && last.is_some_and(|c| !c.is_whitespace()) {
                        out.push(' ');
                    }
                }
            }

            if let Some(ch) = glyph.ch {
                out.push(ch);
            }
            if glyph.bbox.is_some() {
                last_bbox = glyph.bbox;
            }
        }

        out
    }
}

fn same_line(a: Rect, b: Rect) -> bool {
    let overlap = a.y1.min(b.y1) - a.y0.max(b.y0);
    let height = a.height().min(b.height());
    overlap > 0.0 && height > 0.0 && overlap / height >= SAME_LINE_OVERLAP
}

impl<'a> Device<'a> for GlyphCollector {
    fn set_soft_mask(&mut self, _mask: Option<SoftMask<'a>>) {}

    fn set_blend_mode(&mut self, _blend_mode: BlendMode) {}

    fn draw_path(
        &mut self,
        _path: &kurbo::BezPath,
        _transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &PathDrawMode,
    ) {
    }

    fn push_clip_path(&mut self, _clip_path: &ClipPath) {}

    fn push_transparency_group(
        &mut self,
        _opacity: f32,
        _mask: Option<SoftMask<'a>>,
        _blend_mode: BlendMode,
    ) {
    }

    fn draw_glyph(
        &mut self,
        glyph: &Glyph<'a>,
        transform: Affine,
        glyph_transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &GlyphDrawMode,
    ) {
        let bbox = match glyph {
            Glyph::Outline(outline) => {
                Some((transform * (glyph_transform * outline.outline())).bounding_box())
            }
            Glyph::Type3(_) => None,
        };
        self.chars.push(PlacedChar {
            ch: glyph.as_unicode(),
            bbox,
        });
    }

    fn draw_image(&mut self, _image: Image<'a, '_>, _transform: Affine) {}

    fn pop_clip_path(&mut self) {}

    fn pop_transparency_group(&mut self) {}
}
