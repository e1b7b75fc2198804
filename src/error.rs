use thiserror::Error;

/// Errors from the HTTP clients: the generation endpoint, the HKube API and
/// a remote tool host.
#[derive(Debug, Error)]
pub enum HkubeMcpError {
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timeout")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, HkubeMcpError>;
