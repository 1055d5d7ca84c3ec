//! Platform-specific errors

use thiserror::Error;

/// Platform-specific errors
///
/// Starting a running source or stopping a stopped one are idempotent
/// successes, not errors, so no variants exist for them.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The platform permission for traffic interception was not granted
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The capture facility could not be initialized
    #[error("Capture initialization failed: {0}")]
    CaptureInit(String),

    /// The capture facility failed during operation
    #[error("Capture error: {0}")]
    Capture(String),

    /// No capture facility exists on this platform
    #[error("Native capture unsupported on this platform: {0}")]
    Unsupported(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Platform result type
pub type Result<T> = std::result::Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlatformError::CaptureInit("service crashed".to_string());
        assert!(err.to_string().contains("service crashed"));

        let err = PlatformError::PermissionDenied("user declined consent".to_string());
        assert!(err.to_string().contains("user declined"));
    }
}
