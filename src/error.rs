use thiserror::Error;

/// Failure of a single tool invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure or timeout talking to the upstream service.
    #[error("upstream error: request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ToolError>;
