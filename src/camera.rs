//! Camera session management: acquisition, preview attachment and teardown
//! of the single live video stream.

use std::sync::Arc;

use async_trait::async_trait;
use image::RgbaImage;
use log::{debug, info, warn};

use crate::config::CameraConfig;
use crate::error::CameraError;

/// What we ask the device for. Audio is never requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing_mode: String,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl From<&CameraConfig> for StreamConstraints {
    fn from(config: &CameraConfig) -> Self {
        Self {
            facing_mode: config.facing_mode.clone(),
            ideal_width: config.ideal_width,
            ideal_height: config.ideal_height,
        }
    }
}

/// A camera that can be asked for a live stream.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>, CameraError>;
}

/// An open live stream.
#[async_trait]
pub trait VideoStream: Send {
    /// False once every track has ended.
    fn is_active(&mut self) -> bool;

    /// Resolves with the frame size once the first frame is available.
    async fn wait_for_geometry(&mut self) -> Result<(u32, u32), CameraError>;

    /// The most recent frame, unmirrored. `None` while no frame is decodable.
    async fn current_frame(&mut self) -> Option<RgbaImage>;

    /// Stop every track. Must be idempotent.
    fn stop(&mut self);
}

/// Where the (mirrored) live preview is shown.
pub trait DisplaySurface: Send {
    fn attach(&mut self, geometry: Option<(u32, u32)>);
    fn detach(&mut self);
}

/// Surface for headless runs.
#[derive(Debug, Default)]
pub struct HeadlessSurface;

impl DisplaySurface for HeadlessSurface {
    fn attach(&mut self, geometry: Option<(u32, u32)>) {
        debug!("Preview attached (headless) {:?}", geometry);
    }

    fn detach(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Idle,
    Acquiring,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Prompt,
    Granted,
    Denied,
}

/// Owner of the one active stream handle.
pub struct CameraSession {
    device: Arc<dyn CameraDevice>,
    surface: Box<dyn DisplaySurface>,
    constraints: StreamConstraints,
    stream: Option<Box<dyn VideoStream>>,
    attached: bool,
    readiness: Readiness,
    permission: PermissionState,
    error_detail: Option<String>,
    geometry: Option<(u32, u32)>,
}

impl CameraSession {
    pub fn new(
        device: Arc<dyn CameraDevice>,
        surface: Box<dyn DisplaySurface>,
        constraints: StreamConstraints,
    ) -> Self {
        Self {
            device,
            surface,
            constraints,
            stream: None,
            attached: false,
            readiness: Readiness::Idle,
            permission: PermissionState::Prompt,
            error_detail: None,
            geometry: None,
        }
    }

    /// Reuse a healthy stream, or stop the old one and open a new one.
    /// Failures are recorded in `error_detail` and also returned.
    pub async fn acquire(&mut self) -> Result<(), CameraError> {
        self.error_detail = None;

        let reusable = match self.stream.as_mut() {
            Some(stream) => stream.is_active(),
            None => false,
        };
        if reusable {
            if self.attached && self.readiness == Readiness::Ready {
                debug!("Camera stream already attached and ready");
                return Ok(());
            }
            debug!("Reattaching existing camera stream");
            self.attach_and_wait().await;
            return self.outcome();
        }

        self.readiness = Readiness::Acquiring;
        self.stop_stream();

        info!(
            "Requesting {} camera at {}x{}",
            self.constraints.facing_mode, self.constraints.ideal_width, self.constraints.ideal_height
        );
        match self.device.open(&self.constraints).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.permission = PermissionState::Granted;
                self.attach_and_wait().await;
                self.outcome()
            }
            Err(err) => {
                if err == CameraError::PermissionDenied {
                    self.permission = PermissionState::Denied;
                }
                self.fail(&err);
                Err(err)
            }
        }
    }

    async fn attach_and_wait(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        if !self.attached {
            self.surface.attach(self.geometry);
            self.attached = true;
        }

        // Only a known frame size means the preview can play
        match stream.wait_for_geometry().await {
            Ok(geometry) => {
                self.geometry = Some(geometry);
                self.readiness = Readiness::Ready;
                info!("Camera ready at {}x{}", geometry.0, geometry.1);
            }
            Err(err) => self.fail(&err),
        }
    }

    fn outcome(&self) -> Result<(), CameraError> {
        match self.readiness {
            Readiness::Ready => Ok(()),
            _ => Err(CameraError::Other(
                self.error_detail.clone().unwrap_or_else(|| "camera not ready".to_string()),
            )),
        }
    }

    fn fail(&mut self, err: &CameraError) {
        warn!("Camera acquisition failed: {}", err);
        self.readiness = Readiness::Error;
        self.error_detail = Some(err.user_message());
    }

    /// Stop every track and forget the stream. Safe to call repeatedly.
    pub fn release(&mut self) {
        let had_stream = self.stream.is_some();
        self.stop_stream();
        self.readiness = Readiness::Idle;
        if had_stream {
            info!("Camera released");
        }
    }

    fn stop_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
        if self.attached {
            self.surface.detach();
            self.attached = false;
        }
        self.geometry = None;
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn geometry(&self) -> Option<(u32, u32)> {
        self.geometry
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Current frame, only while the session is ready.
    pub async fn ready_frame(&mut self) -> Option<RgbaImage> {
        if !self.is_ready() {
            return None;
        }
        match self.stream.as_mut() {
            Some(stream) => stream.current_frame().await,
            None => None,
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop_stream();
    }
}
