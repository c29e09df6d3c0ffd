use thiserror::Error;

/// Closed failure taxonomy shared by every source and builder.
///
/// A failure is classified once, where it happens (HTTP status, `io::ErrorKind`, timer), and the
/// resulting variant is what retry and propagation logic inspects afterwards.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{}", quota_message(.reset_at, .authenticated))]
    QuotaExceeded {
        /// Unix timestamp (seconds) at which the quota resets
        reset_at: u64,
        authenticated: bool,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn quota_message(reset_at: &u64, authenticated: &bool) -> String {
    if *authenticated {
        format!("API rate limit exceeded, quota resets at {} (unix time)", reset_at)
    } else {
        format!(
            "API rate limit exceeded for unauthenticated requests, quota resets at {} (unix time); add an access token to raise the limit",
            reset_at
        )
    }
}

impl TreeError {
    /// Failures worth another attempt: timeouts and transient network errors.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TreeError::Timeout(_) | TreeError::TransientNetwork(_))
    }

    /// Failures that end the whole build instead of dropping a single entry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TreeError::InvalidInput(_)
                | TreeError::QuotaExceeded { .. }
                | TreeError::NotFound(_)
                | TreeError::PermissionDenied(_)
                | TreeError::Cancelled
        )
    }

    /// Classifies a local I/O failure on `path`.
    pub fn from_io(e: std::io::Error, path: &str) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => TreeError::PermissionDenied(path.to_string()),
            std::io::ErrorKind::NotFound => TreeError::NotFound(path.to_string()),
            _ => TreeError::Io(e),
        }
    }
}
