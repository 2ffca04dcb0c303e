/// Centralized error types for the rate ingestion pipeline
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FxError {
    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // Network Errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    // Feed Errors
    #[error("Feed discovery failed: {0}")]
    Discovery(String),

    #[error("Feed document is not well-formed: {0}")]
    FeedParse(String),

    // Persistence Errors
    #[error("Store lookup failed: {0}")]
    StoreLookup(String),

    #[error("Store write failed: {0}")]
    StoreWrite(String),

    #[error("Deserialization failed: {0}")]
    DeserializationError(#[from] serde_json::Error),

    // File I/O Errors
    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FxError>;

impl FxError {
    /// Check if retrying the same run could plausibly succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            FxError::HttpError(e) => e.is_timeout() || e.is_connect(),
            FxError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            FxError::StoreLookup(_) | FxError::StoreWrite(_) => true,
            _ => false,
        }
    }

    /// Check if the error must stop the process before any network activity
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FxError::ConfigError(_)
                | FxError::ConfigSource(_)
                | FxError::MissingSetting(_)
                | FxError::InvalidParameter(_)
        )
    }

    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &str {
        match self {
            FxError::ConfigError(_) => "CFG_001",
            FxError::ConfigSource(_) => "CFG_002",
            FxError::MissingSetting(_) => "CFG_003",
            FxError::InvalidParameter(_) => "CFG_004",
            FxError::HttpError(_) => "NET_001",
            FxError::HttpStatus { .. } => "NET_002",
            FxError::Discovery(_) => "FEED_001",
            FxError::FeedParse(_) => "FEED_002",
            FxError::StoreLookup(_) => "STORE_001",
            FxError::StoreWrite(_) => "STORE_002",
            FxError::DeserializationError(_) => "DATA_001",
            FxError::FileError(_) => "FILE_001",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_fatal() {
        let err = FxError::MissingSetting("store.project_id".to_string());
        assert!(err.is_fatal());
        assert!(!err.is_recoverable());
        assert_eq!(err.error_code(), "CFG_003");
    }

    #[test]
    fn test_server_status_is_recoverable() {
        let err = FxError::HttpStatus { status: 503, url: "https://example.test".to_string() };
        assert!(err.is_recoverable());

        let err = FxError::HttpStatus { status: 404, url: "https://example.test".to_string() };
        assert!(!err.is_recoverable());
    }
}
