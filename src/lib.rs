//! Moment In: a four-shot photobooth. The [`booth::Photobooth`] actor owns the
//! camera and the countdown; [`compositor::Compositor`] renders the framed strip.

pub mod booth;
pub mod camera;
pub mod camera_controller;
pub mod compositor;
pub mod config;
pub mod crop;
pub mod error;
pub mod filter;
pub mod grabber;
pub mod layout;
pub mod session;
pub mod text;
pub mod theme;
pub mod wizard;

#[cfg(test)]
mod test_support;

pub use booth::{BoothCommand, BoothEvent, Photobooth};
pub use config::Config;
pub use error::{CameraError, CaptureRejected, CompositionError};
