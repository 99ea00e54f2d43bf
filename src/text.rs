use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use rusttype::{point, Font, Scale};

/// Draws single-line labels onto the composed canvas.
pub trait TextPainter: Send + Sync {
    /// Draw `text` horizontally centered on `center_x` with its baseline at `baseline_y`.
    fn draw_centered(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        center_x: i32,
        baseline_y: i32,
        size: f32,
        color: Rgba<u8>,
    );
}

/// TrueType painter backed by rusttype.
pub struct FontPainter {
    font: Font<'static>,
}

impl FontPainter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font file: {}", path.display()))?;
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| anyhow::anyhow!("Invalid font file: {}", path.display()))?;
        log::debug!("Loaded font from {}", path.display());
        Ok(Self { font })
    }

    /// Advance width of `text` at `size` pixels.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let scale = Scale::uniform(size);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }
}

impl TextPainter for FontPainter {
    fn draw_centered(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        center_x: i32,
        baseline_y: i32,
        size: f32,
        color: Rgba<u8>,
    ) {
        let scale = Scale::uniform(size);
        let ascent = self.font.v_metrics(scale).ascent;
        let left = center_x - (self.text_width(text, size) / 2.0).round() as i32;
        // draw_text_mut positions by the top of the line box
        let top = baseline_y - ascent.round() as i32;
        draw_text_mut(canvas, color, left, top, scale, &self.font, text);
    }
}

/// Used when no font could be loaded: the composition still renders, unlabeled.
#[derive(Debug, Default)]
pub struct NoTextPainter;

impl TextPainter for NoTextPainter {
    fn draw_centered(
        &self,
        _canvas: &mut RgbaImage,
        text: &str,
        _center_x: i32,
        _baseline_y: i32,
        _size: f32,
        _color: Rgba<u8>,
    ) {
        log::debug!("No font loaded, skipping label {:?}", text);
    }
}

/// Load the configured font, falling back to [`NoTextPainter`].
pub fn painter_for(font_path: Option<&Path>) -> Box<dyn TextPainter> {
    let Some(path) = font_path else {
        log::warn!("No font configured, labels will be omitted");
        return Box::new(NoTextPainter);
    };
    match FontPainter::from_file(path) {
        Ok(painter) => Box::new(painter),
        Err(e) => {
            log::warn!("{:#}, labels will be omitted", e);
            Box::new(NoTextPainter)
        }
    }
}
