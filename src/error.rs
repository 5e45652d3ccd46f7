use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Recording cancelled or permission denied: {0}")]
    PermissionDenied(String),

    #[error("Could not start recording: {0}")]
    DeviceError(String),

    #[error("Screenshot failed to generate: {0}")]
    RasterizationFailed(String),

    #[error("Screenshot renderer is not available")]
    RasterizerUnavailable,

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("No capture result is available")]
    ResultNotAvailable,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Capture controller has shut down")]
    ControllerClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// User-facing classification of a failed capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    PermissionDenied,
    Device,
    Rasterization,
    Other,
}

impl CaptureError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CaptureError::PermissionDenied(_) => FailureKind::PermissionDenied,
            CaptureError::DeviceError(_) => FailureKind::Device,
            CaptureError::RasterizationFailed(_)
            | CaptureError::RasterizerUnavailable
            | CaptureError::Image(_) => FailureKind::Rasterization,
            _ => FailureKind::Other,
        }
    }
}

impl Serialize for CaptureError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_message() {
        let err = CaptureError::InvalidTransition {
            action: "pause",
            state: "idle",
        };
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            "\"Cannot pause while idle\""
        );
    }

    #[test]
    fn classifies_failures() {
        assert_eq!(
            CaptureError::PermissionDenied("NotAllowedError".into()).kind(),
            FailureKind::PermissionDenied
        );
        assert_eq!(
            CaptureError::DeviceError("no device".into()).kind(),
            FailureKind::Device
        );
        assert_eq!(
            CaptureError::RasterizerUnavailable.kind(),
            FailureKind::Rasterization
        );
        assert_eq!(CaptureError::ControllerClosed.kind(), FailureKind::Other);
    }

    #[test]
    fn io_errors_convert_and_are_not_capture_failures() {
        let err: CaptureError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into();
        assert!(matches!(err, CaptureError::Io(_)));
        assert_eq!(err.to_string(), "IO error: read-only");
        assert_eq!(err.kind(), FailureKind::Other);
    }
}
