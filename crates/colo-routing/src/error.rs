/// Errors raised by the colo routing layer.
///
/// The dataflow itself never fails: pending and failed resolutions are
/// states of [`Addr`](crate::Addr). These variants cover parsing,
/// configuration and scenario loading.
#[derive(Debug, thiserror::Error)]
pub enum ColoError {
    #[error("invalid path: {reason}")]
    InvalidPath { reason: String },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid prefix length: {len} (expected 1..=32)")]
    InvalidPrefixLength { len: u8 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid scenario: {0}")]
    Scenario(String),
}

impl From<serde_json::Error> for ColoError {
    fn from(e: serde_json::Error) -> Self {
        ColoError::Config(e.to_string())
    }
}

/// Result type for colo routing operations.
pub type ColoResult<T> = Result<T, ColoError>;
