//! Error types for the camera, capture and composition boundaries.

use thiserror::Error;

/// Classified camera acquisition failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera device found")]
    DeviceNotFound,

    #[error("camera device is busy")]
    DeviceBusy,

    #[error("camera error: {0}")]
    Other(String),
}

impl CameraError {
    /// Message shown to the user while the preview is blocked.
    pub fn user_message(&self) -> String {
        match self {
            CameraError::PermissionDenied => {
                "Camera permission was denied. Allow camera access in your system settings and retry."
                    .to_string()
            }
            CameraError::DeviceNotFound => {
                "No camera was found. Check that a camera is connected.".to_string()
            }
            CameraError::DeviceBusy => "The camera is being used by another application.".to_string(),
            CameraError::Other(detail) => format!("Camera error: {}", detail),
        }
    }

    /// Classify an I/O error raised while opening a device.
    pub fn from_io(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            ErrorKind::NotFound => CameraError::DeviceNotFound,
            ErrorKind::AddrInUse | ErrorKind::WouldBlock => CameraError::DeviceBusy,
            _ if err.raw_os_error() == Some(16) => CameraError::DeviceBusy, // EBUSY
            _ => CameraError::Other(err.to_string()),
        }
    }
}

/// Reason a capture request was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRejected {
    #[error("a countdown or pause is already running")]
    Busy,

    #[error("photo limit reached")]
    PhotoCapReached,

    #[error("auto-capture is active")]
    AutoModeActive,

    #[error("unsupported countdown delay: {0}s")]
    UnsupportedDelay(u32),
}

#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("drawing surface unavailable for a {width}x{height} canvas")]
    SurfaceUnavailable { width: u32, height: u32 },

    #[error("failed to encode composition: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterParseError {
    #[error("unknown filter function: {0}")]
    UnknownFunction(String),

    #[error("invalid argument for {function}: {argument}")]
    InvalidArgument { function: String, argument: String },

    #[error("malformed filter expression near: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_classification() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(CameraError::from_io(&denied), CameraError::PermissionDenied);

        let missing = io::Error::new(io::ErrorKind::NotFound, "no such file");
        assert_eq!(CameraError::from_io(&missing), CameraError::DeviceNotFound);

        let busy = io::Error::from_raw_os_error(16);
        assert_eq!(CameraError::from_io(&busy), CameraError::DeviceBusy);

        let other = io::Error::new(io::ErrorKind::Other, "weird");
        assert!(matches!(CameraError::from_io(&other), CameraError::Other(_)));
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let messages = [
            CameraError::PermissionDenied.user_message(),
            CameraError::DeviceNotFound.user_message(),
            CameraError::DeviceBusy.user_message(),
            CameraError::Other("x".into()).user_message(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert!(messages[3].contains('x'));
    }
}
