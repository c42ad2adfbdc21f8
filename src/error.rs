use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lookup request to {endpoint} returned HTTP status {status}")]
    LookupStatus { endpoint: String, status: u16 },

    #[error("No UTC offset available for time zone '{time_zone}'")]
    OffsetUnavailable { time_zone: String },

    #[error("Failed to normalize meeting: {0}")]
    Normalization(String),

    #[error("Database error: {message}")]
    Database { message: String },
}

impl EtlError {
    /// Transport-level failures and non-success HTTP statuses are worth
    /// another attempt; a parsed-but-empty lookup response is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EtlError::Http(_) | EtlError::LookupStatus { .. })
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
