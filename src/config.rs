use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::filter::{FilterDefinition, DEFAULT_FILTER_ID};
use crate::layout::LayoutChoice;
use crate::theme::{FrameTheme, DEFAULT_THEME_ID};

pub const ALLOWED_COUNTDOWN_SECONDS: [u32; 3] = [3, 5, 7];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
    pub composition: CompositionConfig,
    pub selection: SelectionConfig,
    pub paths: PathConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraBackend {
    Rpicam,
    TestPattern,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub backend: CameraBackend,
    pub ideal_width: u32,
    pub ideal_height: u32,
    /// `user` for the front camera, `environment` for the rear one
    pub facing_mode: String,
    pub preview_image_path: PathBuf,
    pub preview_poll_ms: u64,
    /// How long to wait for the first decodable frame before giving up
    pub ready_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub countdown_seconds: u32,
    pub inter_shot_pause_ms: u64,
    pub max_photos: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionConfig {
    pub cell_width: u32,
    pub cell_height: u32,
    pub gap: u32,
    pub padding: u32,
    pub top_band: u32,
    pub bottom_band: u32,
    pub corner_radius: f32,
    pub logo_text: String,
    pub logo_font_size: f32,
    pub date_font_size: f32,
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    pub max_canvas_pixels: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub layout: String,
    pub filter: String,
    pub theme: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub export_dir: PathBuf,
    pub config_file: PathBuf,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: CameraBackend::Rpicam,
            ideal_width: 640,
            ideal_height: 480,
            facing_mode: "user".to_string(),
            preview_image_path: PathBuf::from("/tmp/moment_in_preview.jpg"),
            preview_poll_ms: 50,
            ready_timeout_ms: 5000,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: 5,
            inter_shot_pause_ms: 500,
            max_photos: 4,
        }
    }
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            cell_width: 280,
            cell_height: 360,
            gap: 12,
            padding: 30,
            top_band: 60,
            bottom_band: 50,
            corner_radius: 6.0,
            logo_text: "Moment In".to_string(),
            logo_font_size: 28.0,
            date_font_size: 16.0,
            font_path: Some(PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf")),
            max_canvas_pixels: 16_000_000,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            layout: LayoutChoice::default().id().to_string(),
            filter: DEFAULT_FILTER_ID.to_string(),
            theme: DEFAULT_THEME_ID.to_string(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("exports"),
            config_file: PathBuf::from("moment_in_config.toml"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            capture: CaptureConfig::default(),
            composition: CompositionConfig::default(),
            selection: SelectionConfig::default(),
            paths: PathConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("moment_in_config.toml");

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            log::info!("Config file not found, creating default configuration");
            let default_config = Self::default();
            default_config.save()?;
            Ok(default_config)
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| "Failed to parse configuration file")?;
        config.validate()?;

        log::info!("Configuration loaded from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_file(&self.paths.config_file)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(path.as_ref(), contents)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.ideal_width == 0 || self.camera.ideal_height == 0 {
            return Err(anyhow::anyhow!("Invalid camera resolution"));
        }

        if !ALLOWED_COUNTDOWN_SECONDS.contains(&self.capture.countdown_seconds) {
            return Err(anyhow::anyhow!(
                "Invalid countdown delay {}s (allowed: {:?})",
                self.capture.countdown_seconds,
                ALLOWED_COUNTDOWN_SECONDS
            ));
        }

        let layout = self.layout()?;
        if self.capture.max_photos != layout.capacity() {
            return Err(anyhow::anyhow!(
                "max_photos must be {} for layout {}",
                layout.capacity(),
                layout
            ));
        }

        let c = &self.composition;
        if c.cell_width == 0 || c.cell_height == 0 {
            return Err(anyhow::anyhow!("Invalid cell dimensions"));
        }
        if c.corner_radius < 0.0 || c.logo_font_size <= 0.0 || c.date_font_size <= 0.0 {
            return Err(anyhow::anyhow!("Invalid text or corner settings"));
        }

        self.filter()?;
        self.theme()?;
        Ok(())
    }

    pub fn layout(&self) -> Result<LayoutChoice> {
        LayoutChoice::from_id(&self.selection.layout)
            .ok_or_else(|| anyhow::anyhow!("Unknown layout: {}", self.selection.layout))
    }

    pub fn filter(&self) -> Result<&'static FilterDefinition> {
        FilterDefinition::find(&self.selection.filter)
            .ok_or_else(|| anyhow::anyhow!("Unknown filter: {}", self.selection.filter))
    }

    pub fn theme(&self) -> Result<FrameTheme> {
        FrameTheme::find(&self.selection.theme)
            .ok_or_else(|| anyhow::anyhow!("Unknown frame theme: {}", self.selection.theme))
    }

    pub fn create_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.paths.export_dir)
            .with_context(|| format!("Failed to create export directory: {}",
                self.paths.export_dir.display()))?;

        log::info!("Created necessary directories");
        Ok(())
    }
}

// Builder for tests and presets
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn camera_backend(mut self, backend: CameraBackend) -> Self {
        self.config.camera.backend = backend;
        self
    }

    pub fn camera_resolution(mut self, width: u32, height: u32) -> Self {
        self.config.camera.ideal_width = width;
        self.config.camera.ideal_height = height;
        self
    }

    pub fn countdown_seconds(mut self, seconds: u32) -> Self {
        self.config.capture.countdown_seconds = seconds;
        self
    }

    pub fn layout(mut self, layout: LayoutChoice) -> Self {
        self.config.selection.layout = layout.id().to_string();
        self
    }

    pub fn filter(mut self, id: &str) -> Self {
        self.config.selection.filter = id.to_string();
        self
    }

    pub fn theme(mut self, id: &str) -> Self {
        self.config.selection.theme = id.to_string();
        self
    }

    pub fn font_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.composition.font_path = path;
        self
    }

    pub fn export_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.paths.export_dir = dir.into();
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// Presets for the booth hardware and for development machines
impl Config {
    pub fn raspberry_pi() -> Self {
        Config {
            camera: CameraConfig {
                backend: CameraBackend::Rpicam,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn development_desktop() -> Self {
        Config {
            camera: CameraConfig {
                backend: CameraBackend::TestPattern,
                ..Default::default()
            },
            capture: CaptureConfig {
                countdown_seconds: 3,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.countdown_seconds, 5);
        assert_eq!(config.capture.max_photos, 4);
        assert_eq!(config.selection.filter, "none");
        assert_eq!(config.selection.theme, "peach");
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .camera_backend(CameraBackend::TestPattern)
            .camera_resolution(1280, 960)
            .countdown_seconds(7)
            .layout(LayoutChoice::FourCutVertical)
            .filter("bw")
            .theme("mono")
            .build()
            .unwrap();

        assert_eq!(config.camera.backend, CameraBackend::TestPattern);
        assert_eq!((config.camera.ideal_width, config.camera.ideal_height), (1280, 960));
        assert_eq!(config.capture.countdown_seconds, 7);
        assert_eq!(config.layout().unwrap(), LayoutChoice::FourCutVertical);
        assert_eq!(config.filter().unwrap().id, "bw");
        assert_eq!(config.theme().unwrap().id, "mono");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.capture.countdown_seconds = 4;
        assert!(config.validate().is_err());

        config.capture.countdown_seconds = 3;
        config.capture.max_photos = 6;
        assert!(config.validate().is_err());

        config.capture.max_photos = 4;
        config.selection.theme = "neon".into();
        assert!(config.validate().is_err());

        config.selection.theme = "dark".into();
        config.selection.filter = "sparkle".into();
        assert!(config.validate().is_err());

        config.selection.filter = "soft".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let original_config = ConfigBuilder::new()
            .countdown_seconds(3)
            .theme("ocean")
            .font_path(None)
            .build()
            .unwrap();
        original_config.save_to_file(&config_path).unwrap();

        let loaded_config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(loaded_config.capture.countdown_seconds, 3);
        assert_eq!(loaded_config.selection.theme, "ocean");
        assert_eq!(loaded_config.camera.backend, original_config.camera.backend);
        assert!(loaded_config.composition.font_path.is_none());
    }

    #[test]
    fn test_preset_configs() {
        assert!(Config::raspberry_pi().validate().is_ok());
        assert!(Config::development_desktop().validate().is_ok());
        assert_eq!(Config::development_desktop().camera.backend, CameraBackend::TestPattern);
    }
}
