//! The booth actor: one task owns the camera session, the photo collection
//! and the countdown, and reacts to user commands and timer deadlines.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

use crate::camera::{CameraDevice, CameraSession, DisplaySurface, Readiness, StreamConstraints};
use crate::compositor::{Compositor, ExportArtifact};
use crate::config::Config;
use crate::error::{CameraError, CaptureRejected, CompositionError};
use crate::filter::FilterDefinition;
use crate::grabber::{FrameGrabber, PhotoCollection};
use crate::layout::LayoutChoice;
use crate::session::{AfterGrab, CaptureMode, CaptureSession, CaptureSnapshot, TimerOutcome};
use crate::theme::FrameTheme;
use crate::wizard::{CameraTransition, Step, Transition, Wizard};

#[derive(Debug)]
pub enum BoothCommand {
    Goto(Step),
    StartOver,
    SelectLayout(LayoutChoice),
    SelectFilter(String),
    SelectTheme(String),
    SetDelay(u32),
    ManualCapture,
    StartAutoCapture,
    StopAutoCapture,
    Reset,
    RetryCamera,
    Export {
        reply: oneshot::Sender<Result<ExportArtifact, CompositionError>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoothEvent {
    StepChanged(Step),
    CameraReady { width: u32, height: u32 },
    CameraFailed { error: CameraError, message: String },
    Countdown(u32),
    PhotoCaptured { index: usize },
    CaptureSkipped,
    CaptureRejected(CaptureRejected),
    AutoCaptureFinished,
    PhotosReset,
}

pub struct Photobooth {
    wizard: Wizard,
    camera: CameraSession,
    photos: PhotoCollection,
    capture: CaptureSession,
    grabber: FrameGrabber,
    compositor: Compositor,
    export_dir: PathBuf,
    events: mpsc::UnboundedSender<BoothEvent>,
}

impl Photobooth {
    pub fn new(
        config: &Config,
        device: Arc<dyn CameraDevice>,
        surface: Box<dyn DisplaySurface>,
        events: mpsc::UnboundedSender<BoothEvent>,
    ) -> Result<Self> {
        let wizard = Wizard::new(config.layout()?, config.filter()?, config.theme()?);
        Ok(Self {
            wizard,
            camera: CameraSession::new(device, surface, StreamConstraints::from(&config.camera)),
            photos: PhotoCollection::new(config.capture.max_photos),
            capture: CaptureSession::new(&config.capture),
            grabber: FrameGrabber::new(),
            compositor: Compositor::new(config.composition.clone()),
            export_dir: config.paths.export_dir.clone(),
            events,
        })
    }

    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    pub fn step(&self) -> Step {
        self.wizard.step()
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn photos(&self) -> &PhotoCollection {
        &self.photos
    }

    pub fn capture_state(&self) -> CaptureSnapshot {
        self.capture.snapshot()
    }

    pub fn camera_readiness(&self) -> Readiness {
        self.camera.readiness()
    }

    pub fn camera_error(&self) -> Option<&str> {
        self.camera.error_detail()
    }

    /// Process commands and countdown deadlines until the command channel
    /// closes, then release the camera and hand the booth back.
    pub async fn run(mut self, mut commands: mpsc::Receiver<BoothCommand>) -> Self {
        info!("Photobooth running");
        loop {
            let deadline = self.capture.deadline();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                _ = wait_until(deadline) => self.on_deadline().await,
            }
        }

        self.capture.stop();
        self.camera.release();
        info!("Photobooth stopped");
        self
    }

    async fn handle_command(&mut self, command: BoothCommand) {
        debug!("Command: {:?}", command);
        match command {
            BoothCommand::Goto(step) => self.goto(step).await,
            BoothCommand::StartOver => {
                let transition = self.wizard.start_over();
                self.apply_transition(transition).await;
            }
            BoothCommand::SelectLayout(layout) => {
                // The grid cannot change under a running capture
                if self.capture.mode() != CaptureMode::Idle || self.capture.is_auto_active() {
                    warn!("Ignoring layout change to {} during capture", layout);
                    self.reject(CaptureRejected::Busy);
                } else {
                    self.wizard.select_layout(layout);
                }
            }
            BoothCommand::SelectFilter(id) => match FilterDefinition::find(&id) {
                Some(filter) => self.wizard.select_filter(filter),
                None => warn!("Ignoring unknown filter {:?}", id),
            },
            BoothCommand::SelectTheme(id) => match FrameTheme::find(&id) {
                Some(theme) => self.wizard.select_theme(theme),
                None => warn!("Ignoring unknown frame theme {:?}", id),
            },
            BoothCommand::SetDelay(seconds) => {
                if let Err(rejected) = self.capture.set_delay(seconds) {
                    self.reject(rejected);
                }
            }
            BoothCommand::ManualCapture => {
                let started = self.capture.start_manual(Instant::now(), self.photos.len(), self.photos.max_photos());
                self.after_start(started);
            }
            BoothCommand::StartAutoCapture => {
                let started = self.capture.start_auto(Instant::now(), self.photos.len(), self.photos.max_photos());
                self.after_start(started);
            }
            BoothCommand::StopAutoCapture => self.capture.stop(),
            BoothCommand::Reset => self.reset(),
            BoothCommand::RetryCamera => {
                if self.wizard.step().needs_camera() {
                    self.acquire_camera().await;
                } else {
                    debug!("Camera retry ignored on step {}", self.wizard.step());
                }
            }
            BoothCommand::Export { reply } => {
                let result = self.export().await;
                if let Err(e) = &result {
                    warn!("Export failed: {}", e);
                }
                let _ = reply.send(result);
            }
        }
    }

    pub async fn goto(&mut self, step: Step) {
        if step == self.wizard.step() {
            return;
        }
        let transition = self.wizard.goto(step);
        self.apply_transition(transition).await;
    }

    async fn apply_transition(&mut self, transition: Transition) {
        if transition.from == Step::Capture {
            self.capture.stop();
        }
        if transition.reset_photos {
            self.reset();
        }
        info!("Step: {} -> {}", transition.from, transition.to);
        self.emit(BoothEvent::StepChanged(transition.to));

        match transition.camera {
            CameraTransition::Acquire => self.acquire_camera().await,
            CameraTransition::Release => self.camera.release(),
            CameraTransition::Keep => {}
        }
    }

    async fn acquire_camera(&mut self) {
        match self.camera.acquire().await {
            Ok(()) => {
                let (width, height) = self.camera.geometry().unwrap_or_default();
                self.emit(BoothEvent::CameraReady { width, height });
            }
            Err(error) => {
                let message = self
                    .camera
                    .error_detail()
                    .map(str::to_string)
                    .unwrap_or_else(|| error.user_message());
                self.emit(BoothEvent::CameraFailed { error, message });
            }
        }
    }

    fn after_start(&mut self, started: Result<(), CaptureRejected>) {
        match started {
            Ok(()) => self.emit(BoothEvent::Countdown(self.capture.delay_seconds())),
            Err(rejected) => self.reject(rejected),
        }
    }

    fn reject(&self, rejected: CaptureRejected) {
        debug!("Capture request rejected: {}", rejected);
        self.emit(BoothEvent::CaptureRejected(rejected));
    }

    async fn on_deadline(&mut self) {
        let max_photos = self.photos.max_photos();
        match self.capture.on_deadline(Instant::now(), self.photos.len(), max_photos) {
            TimerOutcome::Tick { remaining } | TimerOutcome::CountdownStarted { remaining } => {
                self.emit(BoothEvent::Countdown(remaining));
            }
            TimerOutcome::Grab => {
                let frame = self.camera.ready_frame().await;
                match self.grabber.capture(frame, &mut self.photos) {
                    Some(index) => self.emit(BoothEvent::PhotoCaptured { index }),
                    None => self.emit(BoothEvent::CaptureSkipped),
                }
                if self.capture.after_grab(Instant::now(), self.photos.len(), max_photos) == AfterGrab::AutoFinished {
                    self.emit(BoothEvent::AutoCaptureFinished);
                }
            }
            TimerOutcome::AutoFinished => self.emit(BoothEvent::AutoCaptureFinished),
            TimerOutcome::Idle => {}
        }
    }

    /// Clear all photos and cancel any countdown or pause.
    pub fn reset(&mut self) {
        self.capture.stop();
        self.photos.clear();
        info!("Photos reset");
        self.emit(BoothEvent::PhotosReset);
    }

    async fn export(&mut self) -> Result<ExportArtifact, CompositionError> {
        let canvas = self
            .compositor
            .compose(
                self.photos.photos(),
                self.wizard.layout(),
                self.wizard.filter(),
                self.wizard.theme(),
                chrono::Local::now().date_naive(),
            )
            .await?;
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        self.compositor
            .export(&canvas, self.wizard.layout(), &self.export_dir, timestamp_ms)
            .await
    }

    fn emit(&self, event: BoothEvent) {
        if self.events.send(event).is_err() {
            debug!("No listener for booth events");
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
