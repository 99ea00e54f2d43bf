use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use moment_in::camera::{CameraDevice, HeadlessSurface};
use moment_in::camera_controller::TestPatternCamera;
use moment_in::config::{CameraBackend, Config};
use moment_in::wizard::Step;
use moment_in::{BoothCommand, BoothEvent, Photobooth};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("📸 Starting Moment In photobooth");

    // Load configuration
    let config = Config::load()?;
    config.create_directories()?;
    info!(
        "Configuration loaded: layout {}, filter {}, theme {}, {}s countdown",
        config.selection.layout, config.selection.filter, config.selection.theme, config.capture.countdown_seconds
    );

    let (event_tx, mut events) = mpsc::unbounded_channel();
    let booth = Photobooth::new(&config, camera_device(&config), Box::new(HeadlessSurface), event_tx)?;
    let (commands, command_rx) = mpsc::channel(16);
    let booth_task = tokio::spawn(booth.run(command_rx));

    let send = |command: BoothCommand| {
        let commands = commands.clone();
        async move {
            commands
                .send(command)
                .await
                .map_err(|_| anyhow::anyhow!("Photobooth stopped unexpectedly"))
        }
    };

    // Walk the wizard up to the capture screen
    let mut step = Step::Landing;
    while let Some(next) = step.next().filter(|next| *next != Step::Result) {
        send(BoothCommand::Goto(next)).await?;
        step = next;
    }

    send(BoothCommand::StartAutoCapture).await?;
    while let Some(event) = events.recv().await {
        match event {
            BoothEvent::CameraReady { width, height } => info!("Camera ready ({}x{})", width, height),
            BoothEvent::CameraFailed { message, .. } => {
                return Err(anyhow::anyhow!("{}", message));
            }
            BoothEvent::Countdown(n) => info!("{}...", n),
            BoothEvent::PhotoCaptured { index } => info!("📷 Photo {}/{}", index + 1, config.capture.max_photos),
            BoothEvent::CaptureSkipped => warn!("Camera had no frame, shot skipped"),
            BoothEvent::CaptureRejected(reason) => {
                return Err(anyhow::anyhow!("Capture refused: {}", reason));
            }
            BoothEvent::AutoCaptureFinished => break,
            BoothEvent::StepChanged(_) | BoothEvent::PhotosReset => {}
        }
    }

    send(BoothCommand::Goto(Step::Result)).await?;
    let (reply, exported) = oneshot::channel();
    send(BoothCommand::Export { reply }).await?;
    let artifact = exported
        .await
        .context("Photobooth stopped before exporting")?
        .context("Failed to export composition")?;
    info!("🖼️ Saved {} ({}x{})", artifact.path.display(), artifact.width, artifact.height);

    drop(send);
    drop(commands);
    booth_task.await.context("Photobooth task panicked")?;

    info!("Application shut down gracefully");
    Ok(())
}

fn camera_device(config: &Config) -> Arc<dyn CameraDevice> {
    match config.camera.backend {
        #[cfg(feature = "camera")]
        CameraBackend::Rpicam => Arc::new(moment_in::camera_controller::RpicamCamera::new(&config.camera)),
        #[cfg(not(feature = "camera"))]
        CameraBackend::Rpicam => {
            warn!("Built without camera support, using the test pattern");
            Arc::new(TestPatternCamera)
        }
        CameraBackend::TestPattern => Arc::new(TestPatternCamera),
    }
}
