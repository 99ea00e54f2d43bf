//! Scripted collaborators for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use tokio::time::Duration;

use crate::camera::{CameraDevice, DisplaySurface, StreamConstraints, VideoStream};
use crate::error::CameraError;
use crate::text::TextPainter;

#[derive(Default)]
struct CameraState {
    failure: Mutex<Option<CameraError>>,
    requested: Mutex<Option<StreamConstraints>>,
    opens: AtomicUsize,
    stops: AtomicUsize,
    ended: AtomicBool,
    frames_available: AtomicBool,
    size: Mutex<(u32, u32)>,
    geometry_delay: Mutex<Duration>,
    geometry_failure: Mutex<Option<CameraError>>,
}

/// Camera whose outcome is decided by the test.
#[derive(Clone, Default)]
pub struct ScriptedCamera {
    state: Arc<CameraState>,
}

impl ScriptedCamera {
    pub fn working(width: u32, height: u32) -> Self {
        let camera = Self::default();
        *camera.state.size.lock().unwrap() = (width, height);
        camera.state.frames_available.store(true, Ordering::SeqCst);
        camera
    }

    pub fn failing(err: CameraError) -> Self {
        let camera = Self::working(640, 480);
        camera.set_failure(Some(err));
        camera
    }

    pub fn set_failure(&self, err: Option<CameraError>) {
        *self.state.failure.lock().unwrap() = err;
    }

    /// How long new streams take to report their first frame.
    pub fn set_geometry_delay(&self, delay: Duration) {
        *self.state.geometry_delay.lock().unwrap() = delay;
    }

    /// Streams open but never report a frame size.
    pub fn set_geometry_failure(&self, err: Option<CameraError>) {
        *self.state.geometry_failure.lock().unwrap() = err;
    }

    /// Simulate a readiness gap: the stream stays open but yields no frame.
    pub fn set_frames_available(&self, available: bool) {
        self.state.frames_available.store(available, Ordering::SeqCst);
    }

    pub fn end_all_streams(&self) {
        self.state.ended.store(true, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.state.stops.load(Ordering::SeqCst)
    }

    pub fn live_streams(&self) -> usize {
        self.open_count() - self.stop_count()
    }

    pub fn requested(&self) -> Option<StreamConstraints> {
        self.state.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl CameraDevice for ScriptedCamera {
    async fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>, CameraError> {
        *self.state.requested.lock().unwrap() = Some(constraints.clone());
        if let Some(err) = self.state.failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        self.state.ended.store(false, Ordering::SeqCst);
        Ok(Box::new(ScriptedStream { state: Arc::clone(&self.state), stopped: false }))
    }
}

struct ScriptedStream {
    state: Arc<CameraState>,
    stopped: bool,
}

#[async_trait]
impl VideoStream for ScriptedStream {
    fn is_active(&mut self) -> bool {
        !self.stopped && !self.state.ended.load(Ordering::SeqCst)
    }

    async fn wait_for_geometry(&mut self) -> Result<(u32, u32), CameraError> {
        let delay = *self.state.geometry_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.state.geometry_failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(*self.state.size.lock().unwrap())
    }

    /// Left half red, right half blue, so mirroring is observable.
    async fn current_frame(&mut self) -> Option<RgbaImage> {
        if self.stopped || !self.state.frames_available.load(Ordering::SeqCst) {
            return None;
        }
        let (width, height) = *self.state.size.lock().unwrap();
        Some(RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        }))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.state.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    attaches: Arc<AtomicUsize>,
    detaches: Arc<AtomicUsize>,
}

impl RecordingSurface {
    pub fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    pub fn detach_count(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }
}

impl DisplaySurface for RecordingSurface {
    fn attach(&mut self, _geometry: Option<(u32, u32)>) {
        self.attaches.fetch_add(1, Ordering::SeqCst);
    }

    fn detach(&mut self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnText {
    pub text: String,
    pub center_x: i32,
    pub baseline_y: i32,
    pub size: f32,
    pub color: Rgba<u8>,
    /// Canvas contents at the moment the text was drawn.
    pub canvas_snapshot: RgbaImage,
}

/// Painter that records calls instead of rasterizing glyphs.
#[derive(Clone, Default)]
pub struct RecordingPainter {
    calls: Arc<Mutex<Vec<DrawnText>>>,
}

impl RecordingPainter {
    pub fn calls(&self) -> Vec<DrawnText> {
        self.calls.lock().unwrap().clone()
    }
}

impl TextPainter for RecordingPainter {
    fn draw_centered(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        center_x: i32,
        baseline_y: i32,
        size: f32,
        color: Rgba<u8>,
    ) {
        self.calls.lock().unwrap().push(DrawnText {
            text: text.to_string(),
            center_x,
            baseline_y,
            size,
            color,
            canvas_snapshot: canvas.clone(),
        });
    }
}
