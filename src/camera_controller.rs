use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use image::{ImageBuffer, Rgba, RgbaImage};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout, Duration};

use crate::camera::{CameraDevice, StreamConstraints, VideoStream};
use crate::config::CameraConfig;
use crate::error::CameraError;

/// Raspberry Pi camera driven through `rpicam-still` in timelapse mode.
/// The tool keeps overwriting one preview still; that file is the stream.
pub struct RpicamCamera {
    program: String,
    preview_image_path: PathBuf,
    poll_interval: Duration,
    ready_timeout: Duration,
}

impl RpicamCamera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            program: "rpicam-still".to_string(),
            preview_image_path: config.preview_image_path.clone(),
            poll_interval: Duration::from_millis(config.preview_poll_ms.max(1)),
            ready_timeout: Duration::from_millis(config.ready_timeout_ms),
        }
    }

    /// Use a different camera tool binary (e.g. legacy `raspistill`).
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    fn preview_args(&self, constraints: &StreamConstraints) -> Vec<String> {
        // Camera 0 is the one facing the booth user
        let camera_index = if constraints.facing_mode == "environment" { "1" } else { "0" };
        vec![
            "--camera".into(), camera_index.into(),
            "-o".into(), self.preview_image_path.display().to_string(),
            "--width".into(), constraints.ideal_width.to_string(),
            "--height".into(), constraints.ideal_height.to_string(),
            "--quality".into(), "70".into(),
            "--timeout".into(), "0".into(),      // Run until killed
            "--timelapse".into(), self.poll_interval.as_millis().to_string(),
            "--nopreview".into(),
            "--immediate".into(),
        ]
    }
}

#[async_trait]
impl CameraDevice for RpicamCamera {
    async fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>, CameraError> {
        // Never serve a still left over from an earlier session
        let _ = tokio::fs::remove_file(&self.preview_image_path).await;

        let args = self.preview_args(constraints);
        log::info!("Preview command: {} {}", self.program, args.join(" "));

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                log::error!("Failed to start {}: {}", self.program, e);
                CameraError::from_io(&e)
            })?;

        Ok(Box::new(RpicamStream {
            child: Some(child),
            preview_image_path: self.preview_image_path.clone(),
            poll_interval: self.poll_interval,
            ready_timeout: self.ready_timeout,
        }))
    }
}

struct RpicamStream {
    child: Option<Child>,
    preview_image_path: PathBuf,
    poll_interval: Duration,
    ready_timeout: Duration,
}

impl RpicamStream {
    async fn exit_error(&mut self) -> Option<CameraError> {
        let child = self.child.as_mut()?;
        let status = child.try_wait().ok().flatten()?;

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr).await;
        }
        log::warn!("Camera process exited with {}: {}", status, stderr.trim());
        self.child = None;
        Some(classify_stderr(&stderr))
    }
}

#[async_trait]
impl VideoStream for RpicamStream {
    fn is_active(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    async fn wait_for_geometry(&mut self) -> Result<(u32, u32), CameraError> {
        let deadline = self.ready_timeout;
        let waited = timeout(deadline, async {
            loop {
                if let Some(err) = self.exit_error().await {
                    return Err(err);
                }
                if let Some(frame) = load_preview(&self.preview_image_path).await {
                    return Ok(frame.dimensions());
                }
                sleep(self.poll_interval).await;
            }
        })
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => Err(CameraError::Other(format!(
                "no preview frame after {}ms",
                deadline.as_millis()
            ))),
        }
    }

    async fn current_frame(&mut self) -> Option<RgbaImage> {
        self.child.as_ref()?;
        load_preview(&self.preview_image_path).await
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
            log::info!("Camera preview stopped");
        }
        if self.preview_image_path.exists() {
            let _ = std::fs::remove_file(&self.preview_image_path);
        }
    }
}

impl Drop for RpicamStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Decode the preview still; a half-written file reads as "no frame yet".
/// Decoding runs on the blocking pool so the booth task keeps ticking.
async fn load_preview(path: &Path) -> Option<RgbaImage> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::debug!("Preview frame not readable yet: {}", e);
            return None;
        }
    };
    let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes).map(|img| img.to_rgba8())).await;
    match decoded {
        Ok(Ok(frame)) => Some(frame),
        Ok(Err(e)) => {
            log::debug!("Preview frame not decodable yet: {}", e);
            None
        }
        Err(e) => {
            log::warn!("Preview decode task failed: {}", e);
            None
        }
    }
}

fn classify_stderr(stderr: &str) -> CameraError {
    let lower = stderr.to_lowercase();
    if lower.contains("permission denied") || lower.contains("not permitted") {
        CameraError::PermissionDenied
    } else if lower.contains("no cameras available") || lower.contains("no such device") {
        CameraError::DeviceNotFound
    } else if lower.contains("busy") || lower.contains("in use") {
        CameraError::DeviceBusy
    } else if stderr.trim().is_empty() {
        CameraError::Other("camera process exited".to_string())
    } else {
        CameraError::Other(stderr.trim().lines().last().unwrap_or_default().to_string())
    }
}

/// Synthetic camera for development machines without camera hardware.
#[derive(Debug, Default)]
pub struct TestPatternCamera;

#[async_trait]
impl CameraDevice for TestPatternCamera {
    async fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>, CameraError> {
        log::warn!("Camera not available - streaming test pattern");
        Ok(Box::new(TestPatternStream {
            width: constraints.ideal_width,
            height: constraints.ideal_height,
            frame_counter: 0,
            active: true,
        }))
    }
}

struct TestPatternStream {
    width: u32,
    height: u32,
    frame_counter: u32,
    active: bool,
}

#[async_trait]
impl VideoStream for TestPatternStream {
    fn is_active(&mut self) -> bool {
        self.active
    }

    async fn wait_for_geometry(&mut self) -> Result<(u32, u32), CameraError> {
        Ok((self.width, self.height))
    }

    async fn current_frame(&mut self) -> Option<RgbaImage> {
        if !self.active {
            return None;
        }
        let frame = self.frame_counter;
        self.frame_counter = self.frame_counter.wrapping_add(1);
        let (width, height) = (self.width, self.height);
        let shift = frame.wrapping_mul(40) % 256;
        Some(ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x * 255 / width) as u8;
            let g = (y * 255 / height) as u8;
            let b = (((x + y) * 255 / (width + height) + shift) % 256) as u8;
            Rgba([r, g, b, 255])
        }))
    }

    fn stop(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints() -> StreamConstraints {
        StreamConstraints::from(&CameraConfig::default())
    }

    #[test]
    fn test_stderr_classification() {
        assert_eq!(
            classify_stderr("ERROR: *** no cameras available ***"),
            CameraError::DeviceNotFound
        );
        assert_eq!(
            classify_stderr("failed to acquire camera: Device or resource busy"),
            CameraError::DeviceBusy
        );
        assert_eq!(
            classify_stderr("open /dev/video0: Permission denied"),
            CameraError::PermissionDenied
        );
        assert_eq!(
            classify_stderr("line one\nsomething odd"),
            CameraError::Other("something odd".into())
        );
    }

    #[test]
    fn test_preview_args_follow_constraints() {
        let camera = RpicamCamera::new(&CameraConfig::default());
        let args = camera.preview_args(&constraints());
        let joined = args.join(" ");
        assert!(joined.contains("--width 640"));
        assert!(joined.contains("--height 480"));
        assert!(joined.contains("--camera 0"));
    }

    #[tokio::test]
    async fn test_missing_program_is_device_not_found() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = CameraConfig {
            preview_image_path: temp_dir.path().join("preview.jpg"),
            ..Default::default()
        };
        let camera = RpicamCamera::new(&config).with_program("definitely-not-a-camera-tool-xyz");
        let result = camera.open(&constraints()).await;
        assert!(matches!(result, Err(CameraError::DeviceNotFound)));
    }

    #[tokio::test]
    async fn test_pattern_stream_lifecycle() {
        let mut stream = TestPatternCamera.open(&constraints()).await.unwrap();
        assert!(stream.is_active());
        assert_eq!(stream.wait_for_geometry().await.unwrap(), (640, 480));
        let first = stream.current_frame().await.unwrap();
        assert_eq!(first.dimensions(), (640, 480));
        assert_ne!(stream.current_frame().await.unwrap(), first);

        stream.stop();
        assert!(!stream.is_active());
        assert!(stream.current_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_load_preview_reads_written_still() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("preview.png");
        RgbaImage::from_pixel(32, 24, Rgba([10, 20, 30, 255])).save(&path).unwrap();

        let frame = load_preview(&path).await.unwrap();
        assert_eq!(frame.dimensions(), (32, 24));
        assert_eq!(frame.get_pixel(5, 5), &Rgba([10, 20, 30, 255]));
    }

    #[tokio::test]
    async fn test_load_preview_missing_or_partial_file_is_no_frame() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        assert!(load_preview(&temp_dir.path().join("missing.jpg")).await.is_none());

        let partial = temp_dir.path().join("partial.jpg");
        std::fs::write(&partial, [0xFF, 0xD8, 0xFF, 0xE0, 0x00]).unwrap();
        assert!(load_preview(&partial).await.is_none());
    }
}
