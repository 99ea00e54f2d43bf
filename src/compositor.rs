//! Builds the final framed strip: themed gradient, photos in their grid
//! cells with the chosen filter, then the logo and date on top.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use log::{debug, info, warn};
use tokio::task::JoinSet;

use crate::config::CompositionConfig;
use crate::crop::crop_and_fit;
use crate::error::CompositionError;
use crate::filter::{FilterChain, FilterDefinition};
use crate::grabber::Photo;
use crate::layout::{GridGeometry, LayoutChoice};
use crate::text::{painter_for, TextPainter};
use crate::theme::FrameTheme;

pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// A composition written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

pub struct Compositor {
    config: CompositionConfig,
    painter: Arc<dyn TextPainter>,
}

impl Compositor {
    pub fn new(config: CompositionConfig) -> Self {
        let painter: Arc<dyn TextPainter> = painter_for(config.font_path.as_deref()).into();
        Self { config, painter }
    }

    pub fn with_painter(config: CompositionConfig, painter: Arc<dyn TextPainter>) -> Self {
        Self { config, painter }
    }

    /// Render `photos` into `layout`. Photos beyond the layout's capacity are
    /// ignored; photos that fail to decode leave their cell showing the
    /// background. Text is always drawn after every photo has landed.
    pub async fn compose(
        &self,
        photos: &[Photo],
        layout: LayoutChoice,
        filter: &FilterDefinition,
        theme: &FrameTheme,
        date: NaiveDate,
    ) -> Result<RgbaImage, CompositionError> {
        let geometry = layout.geometry(&self.config);
        let (width, height) = geometry.canvas_size();
        if width == 0 || height == 0 || u64::from(width) * u64::from(height) > self.config.max_canvas_pixels {
            return Err(CompositionError::SurfaceUnavailable { width, height });
        }

        let mut canvas = paint_background(width, height, theme);

        let chain = filter.chain().unwrap_or_else(|e| {
            warn!("Filter {} unusable ({}), drawing photos unfiltered", filter.id, e);
            FilterChain::default()
        });

        let cell = (geometry.cell_width, geometry.cell_height);
        let mut cells = JoinSet::new();
        for (index, photo) in photos.iter().take(layout.capacity()).enumerate() {
            let photo = photo.clone();
            let chain = chain.clone();
            cells.spawn_blocking(move || {
                let decoded = photo.decode().map_err(|e| (index, e))?;
                let mut fitted = crop_and_fit(&decoded, cell);
                chain.apply(&mut fitted);
                Ok::<_, (usize, image::ImageError)>((index, fitted))
            });
        }

        while let Some(joined) = cells.join_next().await {
            match joined {
                Ok(Ok((index, fitted))) => {
                    if let Some(origin) = geometry.cell_origin(index) {
                        blend_rounded(&mut canvas, &fitted, origin, self.config.corner_radius);
                        debug!("Placed photo {} at {:?}", index + 1, origin);
                    }
                }
                Ok(Err((index, e))) => warn!("Photo {} could not be decoded, leaving cell empty: {}", index + 1, e),
                Err(e) => warn!("Photo task failed, leaving cell empty: {}", e),
            }
        }

        self.draw_labels(&mut canvas, &geometry, theme, date);

        info!(
            "Composed {} photo(s) into {} ({}x{}, filter {}, theme {})",
            photos.len().min(layout.capacity()),
            layout,
            width,
            height,
            filter.id,
            theme.id
        );
        Ok(canvas)
    }

    fn draw_labels(&self, canvas: &mut RgbaImage, geometry: &GridGeometry, theme: &FrameTheme, date: NaiveDate) {
        let center_x = (geometry.canvas_width() / 2) as i32;
        self.painter.draw_centered(
            canvas,
            &self.config.logo_text,
            center_x,
            geometry.logo_baseline() as i32,
            self.config.logo_font_size,
            theme.text_color,
        );
        self.painter.draw_centered(
            canvas,
            &date.format(DATE_FORMAT).to_string(),
            center_x,
            geometry.date_baseline() as i32,
            self.config.date_font_size,
            theme.text_color,
        );
    }

    /// Encode `image` as PNG and write it into `export_dir`.
    /// Nothing is written if encoding fails.
    pub async fn export(
        &self,
        image: &RgbaImage,
        layout: LayoutChoice,
        export_dir: &Path,
        timestamp_ms: i64,
    ) -> Result<ExportArtifact, CompositionError> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image.clone()).write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;

        tokio::fs::create_dir_all(export_dir).await?;
        let path = export_dir.join(export_filename(layout, timestamp_ms));
        tokio::fs::write(&path, &bytes).await?;

        info!("Exported {} ({} bytes)", path.display(), bytes.len());
        Ok(ExportArtifact {
            path,
            width: image.width(),
            height: image.height(),
        })
    }
}

pub fn export_filename(layout: LayoutChoice, timestamp_ms: i64) -> String {
    format!("moment-in-{}-{}.png", layout.id(), timestamp_ms)
}

/// Diagonal gradient from the top-left corner to the bottom-right one.
fn paint_background(width: u32, height: u32, theme: &FrameTheme) -> RgbaImage {
    let (w, h) = (width as f32, height as f32);
    let length_sq = w * w + h * h;
    RgbaImage::from_fn(width, height, |x, y| {
        let t = (x as f32 * w + y as f32 * h) / length_sq;
        theme.gradient_at(t)
    })
}

/// Fraction of the pixel centered at (`px`, `py`) inside a `w`x`h` rectangle
/// with corners rounded by `radius`.
fn rounded_coverage(px: f32, py: f32, w: f32, h: f32, radius: f32) -> f32 {
    let radius = radius.min(w / 2.0).min(h / 2.0);
    if radius <= 0.0 {
        return 1.0;
    }
    let cx = px.clamp(radius, w - radius);
    let cy = py.clamp(radius, h - radius);
    let (dx, dy) = (px - cx, py - cy);
    if dx == 0.0 && dy == 0.0 {
        return 1.0;
    }
    let distance = (dx * dx + dy * dy).sqrt();
    (radius - distance + 0.5).clamp(0.0, 1.0)
}

fn blend_rounded(canvas: &mut RgbaImage, photo: &RgbaImage, origin: (u32, u32), radius: f32) {
    let (w, h) = (photo.width() as f32, photo.height() as f32);
    for (x, y, src) in photo.enumerate_pixels() {
        let (cx, cy) = (origin.0 + x, origin.1 + y);
        if cx >= canvas.width() || cy >= canvas.height() {
            continue;
        }
        let coverage = rounded_coverage(x as f32 + 0.5, y as f32 + 0.5, w, h, radius);
        let alpha = coverage * f32::from(src.0[3]) / 255.0;
        if alpha <= 0.0 {
            continue;
        }
        let dst = canvas.get_pixel_mut(cx, cy);
        let mix = |s: u8, d: u8| (f32::from(s) * alpha + f32::from(d) * (1.0 - alpha)).round() as u8;
        *dst = Rgba([
            mix(src.0[0], dst.0[0]),
            mix(src.0[1], dst.0[1]),
            mix(src.0[2], dst.0[2]),
            255,
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingPainter;
    use tempfile::TempDir;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn compositor(painter: &RecordingPainter) -> Compositor {
        Compositor::with_painter(
            CompositionConfig { font_path: None, ..Default::default() },
            Arc::new(painter.clone()),
        )
    }

    fn black_photo() -> Photo {
        Photo::encode(&RgbaImage::from_pixel(300, 400, BLACK)).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn close(a: &Rgba<u8>, b: Rgba<u8>) -> bool {
        a.0.iter().zip(b.0.iter()).all(|(x, y)| (*x as i16 - *y as i16).abs() <= 1)
    }

    #[tokio::test]
    async fn test_single_photo_on_mono_theme() {
        let painter = RecordingPainter::default();
        let mono = FrameTheme::find("mono").unwrap();
        let canvas = compositor(&painter)
            .compose(&[black_photo()], LayoutChoice::FourCut, FilterDefinition::none(), &mono, date())
            .await
            .unwrap();

        assert_eq!(canvas.dimensions(), (632, 902));
        assert!(close(canvas.get_pixel(0, 0), Rgba([0xf5, 0xf5, 0xf5, 255])));
        assert!(close(canvas.get_pixel(631, 901), Rgba([0xe0, 0xe0, 0xe0, 255])));

        // Cell 1 is filled, the rest show the background
        assert_eq!(canvas.get_pixel(30 + 140, 90 + 180), &BLACK);
        let empty_cell = canvas.get_pixel(30 + 280 + 12 + 140, 90 + 180);
        assert!(empty_cell.0[0] > 0xd0);

        // Rounded corner keeps the background
        assert_ne!(canvas.get_pixel(30, 90), &BLACK);
        assert_eq!(canvas.get_pixel(30 + 6, 90 + 6), &BLACK);

        let calls = painter.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].text, "Moment In");
        assert_eq!(calls[0].center_x, 316);
        assert_eq!(calls[0].baseline_y, 65);
        assert_eq!(calls[1].text, "10/19/2026");
        assert_eq!(calls[1].baseline_y, 882);
        for call in &calls {
            assert_eq!(call.color, Rgba([0x42, 0x42, 0x42, 255]));
        }
    }

    #[tokio::test]
    async fn test_text_is_drawn_after_photos() {
        let painter = RecordingPainter::default();
        let photos = vec![black_photo(); 4];
        compositor(&painter)
            .compose(&photos, LayoutChoice::FourCut, FilterDefinition::none(), &FrameTheme::default_theme(), date())
            .await
            .unwrap();

        let geometry = LayoutChoice::FourCut.geometry(&CompositionConfig::default());
        let first_label = &painter.calls()[0].canvas_snapshot;
        for index in 0..4 {
            let (x, y) = geometry.cell_origin(index).unwrap();
            assert_eq!(first_label.get_pixel(x + 100, y + 100), &BLACK);
        }
    }

    #[tokio::test]
    async fn test_vertical_layout_exports_two_column_grid() {
        let painter = RecordingPainter::default();
        let photos = vec![black_photo(); 4];
        let canvas = compositor(&painter)
            .compose(&photos, LayoutChoice::FourCutVertical, FilterDefinition::none(), &FrameTheme::default_theme(), date())
            .await
            .unwrap();

        assert_eq!(canvas.dimensions(), (632, 902));
        let geometry = LayoutChoice::FourCutVertical.geometry(&CompositionConfig::default());
        assert_eq!(geometry.cell_origin(1), Some((322, 90)));
        for index in 0..4 {
            let (x, y) = geometry.cell_origin(index).unwrap();
            assert_eq!(canvas.get_pixel(x + 140, y + 180), &BLACK);
        }
    }

    #[tokio::test]
    async fn test_date_label_is_zero_padded() {
        let painter = RecordingPainter::default();
        let march = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        compositor(&painter)
            .compose(&[black_photo()], LayoutChoice::FourCut, FilterDefinition::none(), &FrameTheme::default_theme(), march)
            .await
            .unwrap();

        let calls = painter.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].text, "03/07/2026");
    }

    #[tokio::test]
    async fn test_filter_is_applied_to_photos() {
        let painter = RecordingPainter::default();
        let red = Photo::encode(&RgbaImage::from_pixel(300, 400, Rgba([200, 30, 30, 255]))).unwrap();
        let bw = FilterDefinition::find("bw").unwrap();
        let canvas = compositor(&painter)
            .compose(&[red], LayoutChoice::FourCut, bw, &FrameTheme::default_theme(), date())
            .await
            .unwrap();

        let pixel = canvas.get_pixel(170, 270);
        assert_eq!(pixel.0[0], pixel.0[1]);
        assert_eq!(pixel.0[1], pixel.0[2]);
    }

    #[tokio::test]
    async fn test_undecodable_photo_leaves_background() {
        let painter = RecordingPainter::default();
        let photos = vec![Photo::from_png(vec![0, 1, 2, 3]), black_photo()];
        let canvas = compositor(&painter)
            .compose(&photos, LayoutChoice::FourCut, FilterDefinition::none(), &FrameTheme::default_theme(), date())
            .await
            .unwrap();

        assert_ne!(canvas.get_pixel(170, 270), &BLACK);
        assert_eq!(canvas.get_pixel(30 + 292 + 140, 270), &BLACK);
        assert_eq!(painter.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_canvas_aborts() {
        let painter = RecordingPainter::default();
        let compositor = Compositor::with_painter(
            CompositionConfig { max_canvas_pixels: 1000, ..Default::default() },
            Arc::new(painter.clone()),
        );
        let result = compositor
            .compose(&[], LayoutChoice::FourCut, FilterDefinition::none(), &FrameTheme::default_theme(), date())
            .await;

        assert!(matches!(result, Err(CompositionError::SurfaceUnavailable { width: 632, height: 902 })));
        assert!(painter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_export_writes_png() {
        let temp_dir = TempDir::new().unwrap();
        let painter = RecordingPainter::default();
        let compositor = compositor(&painter);
        let image = RgbaImage::from_pixel(10, 20, BLACK);

        let artifact = compositor
            .export(&image, LayoutChoice::FourCutVertical, &temp_dir.path().join("out"), 1_700_000_000_000)
            .await
            .unwrap();

        assert_eq!(
            artifact.path.file_name().unwrap().to_str().unwrap(),
            "moment-in-4cut-vertical-1700000000000.png"
        );
        assert_eq!((artifact.width, artifact.height), (10, 20));
        let reloaded = image::open(&artifact.path).unwrap();
        assert_eq!(reloaded.width(), 10);
    }

    #[test]
    fn test_rounded_coverage() {
        assert_eq!(rounded_coverage(0.5, 0.5, 100.0, 100.0, 6.0), 0.0);
        assert_eq!(rounded_coverage(50.0, 0.5, 100.0, 100.0, 6.0), 1.0);
        assert_eq!(rounded_coverage(6.5, 6.5, 100.0, 100.0, 6.0), 1.0);
        assert_eq!(rounded_coverage(0.5, 0.5, 100.0, 100.0, 0.0), 1.0);
    }
}
