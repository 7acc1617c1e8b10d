use thiserror::Error;

/// Tracking engine error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Geolocation is not supported: {0}")]
    SourceUnavailable(String),

    #[error("Location permission denied: {0}")]
    PermissionDenied(String),

    #[error("Timed out acquiring a position fix after {0} ms")]
    Timeout(u64),

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TrackerError {
    /// Errors after which the position subscription can no longer deliver samples
    pub fn is_fatal_to_subscription(&self) -> bool {
        matches!(
            self,
            TrackerError::SourceUnavailable(_) | TrackerError::PermissionDenied(_)
        )
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization(err.to_string())
    }
}

/// Result type for tracking operations
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackerError::Timeout(15000);
        assert!(err.to_string().contains("15000 ms"));

        let err = TrackerError::PermissionDenied("user declined".to_string());
        assert!(err.to_string().contains("user declined"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TrackerError::PermissionDenied(String::new()).is_fatal_to_subscription());
        assert!(TrackerError::SourceUnavailable(String::new()).is_fatal_to_subscription());
        assert!(!TrackerError::Timeout(1).is_fatal_to_subscription());
    }
}
