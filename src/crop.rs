use image::{imageops, RgbaImage};

/// Source rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }

    /// Snap to whole pixels inside `bounds`, never collapsing to zero size.
    pub fn to_pixels(&self, bounds: (u32, u32)) -> (u32, u32, u32, u32) {
        let (max_w, max_h) = bounds;
        let x = (self.x.round().max(0.0) as u32).min(max_w.saturating_sub(1));
        let y = (self.y.round().max(0.0) as u32).min(max_h.saturating_sub(1));
        let width = (self.width.round() as u32).clamp(1, max_w - x);
        let height = (self.height.round() as u32).clamp(1, max_h - y);
        (x, y, width, height)
    }
}

/// Center-crop-to-fill: the largest rectangle of the target aspect ratio,
/// centered in the source, trimming equal margins off the longer side.
pub fn center_crop_to_fill(source: (u32, u32), target: (u32, u32)) -> CropRect {
    let (src_w, src_h) = (source.0 as f32, source.1 as f32);
    let image_ratio = src_w / src_h;
    let target_ratio = target.0 as f32 / target.1 as f32;

    if image_ratio > target_ratio {
        // Relatively wider: trim left and right
        let width = src_h * target_ratio;
        CropRect { x: (src_w - width) / 2.0, y: 0.0, width, height: src_h }
    } else if image_ratio < target_ratio {
        // Relatively taller: trim top and bottom
        let height = src_w / target_ratio;
        CropRect { x: 0.0, y: (src_h - height) / 2.0, width: src_w, height }
    } else {
        CropRect { x: 0.0, y: 0.0, width: src_w, height: src_h }
    }
}

/// Crop `image` to the target aspect ratio and scale it to exactly `target`.
pub fn crop_and_fit(image: &RgbaImage, target: (u32, u32)) -> RgbaImage {
    let rect = center_crop_to_fill(image.dimensions(), target);
    let (x, y, width, height) = rect.to_pixels(image.dimensions());
    let cropped = imageops::crop_imm(image, x, y, width, height).to_image();

    if cropped.dimensions() == target {
        return cropped;
    }
    imageops::resize(&cropped, target.0, target.1, imageops::FilterType::Triangle)
}
