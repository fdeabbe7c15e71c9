use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors raised by tool lookup or execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid input for tool '{tool}': {message}")]
    InvalidInput { tool: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Tool execution failed: {0}")]
    Execution(String),
}
