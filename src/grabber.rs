use std::io::Cursor;
use std::sync::Arc;

use image::{imageops, DynamicImage, ImageOutputFormat, RgbaImage};
use log::{debug, info, warn};

/// One captured still, PNG-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    png: Arc<[u8]>,
}

impl Photo {
    pub fn from_png(bytes: Vec<u8>) -> Self {
        Self { png: bytes.into() }
    }

    pub fn encode(image: &RgbaImage) -> Result<Self, image::ImageError> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
        Ok(Self::from_png(bytes))
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn decode(&self) -> Result<RgbaImage, image::ImageError> {
        Ok(image::load_from_memory(&self.png)?.to_rgba8())
    }
}

/// Ordered captured photos, never longer than `max_photos`.
#[derive(Debug, Clone)]
pub struct PhotoCollection {
    photos: Vec<Photo>,
    max_photos: usize,
}

impl PhotoCollection {
    pub fn new(max_photos: usize) -> Self {
        Self {
            photos: Vec::with_capacity(max_photos),
            max_photos,
        }
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.photos.len() >= self.max_photos
    }

    pub fn max_photos(&self) -> usize {
        self.max_photos
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    /// Returns the new photo's index, or `None` when already full.
    fn push(&mut self, photo: Photo) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        self.photos.push(photo);
        Some(self.photos.len() - 1)
    }

    pub fn clear(&mut self) {
        self.photos.clear();
    }
}

/// Turns the current preview frame into a stored photo.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameGrabber;

impl FrameGrabber {
    pub fn new() -> Self {
        Self
    }

    /// Mirror `frame` so it matches the preview, encode it and append it.
    /// Any missing precondition makes this a silent no-op.
    pub fn capture(&self, frame: Option<RgbaImage>, photos: &mut PhotoCollection) -> Option<usize> {
        let Some(frame) = frame else {
            warn!("Capture skipped: video source not ready");
            return None;
        };
        if frame.width() == 0 || frame.height() == 0 {
            warn!("Capture skipped: empty frame");
            return None;
        }
        if photos.is_full() {
            debug!("Capture skipped: collection full");
            return None;
        }

        let mirrored = imageops::flip_horizontal(&frame);
        let photo = match Photo::encode(&mirrored) {
            Ok(photo) => photo,
            Err(e) => {
                warn!("Capture skipped: encoding failed: {}", e);
                return None;
            }
        };

        let index = photos.push(photo)?;
        info!(
            "Photo {}/{} captured ({}x{})",
            index + 1,
            photos.max_photos(),
            frame.width(),
            frame.height()
        );
        Some(index)
    }
}
