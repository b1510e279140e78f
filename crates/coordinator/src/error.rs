use thiserror::Error;

/// Why an issued request did not produce a payload.
///
/// The coordinator treats every variant the same way; the detail only
/// reaches the logs.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum TransportError {
    #[error("Request failed. {0}")]
    Failed(String),

    #[error("Upstream responded with status {0}.")]
    Status(u16),

    #[error("Invalid response. {0}")]
    Decode(String),

    #[error("Timeout.")]
    Timeout,
}
