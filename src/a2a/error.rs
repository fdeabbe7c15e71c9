use super::types::{JsonRpcResponse, error_codes};
use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, A2aError>;

/// Protocol-level failures, each mapped to a JSON-RPC error code.
#[derive(Debug, Error)]
pub enum A2aError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task cannot be canceled: {0}")]
    TaskNotCancelable(String),

    #[error("{0}")]
    UnsupportedOperation(String),

    #[error("Incompatible content types: {0}")]
    ContentTypeNotSupported(String),

    #[error("Event queue closed")]
    QueueClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl A2aError {
    pub fn code(&self) -> i64 {
        match self {
            Self::InvalidParams(_) => error_codes::INVALID_PARAMS,
            Self::TaskNotFound(_) => error_codes::TASK_NOT_FOUND,
            Self::TaskNotCancelable(_) => error_codes::TASK_NOT_CANCELABLE,
            Self::UnsupportedOperation(_) => error_codes::UNSUPPORTED_OPERATION,
            Self::ContentTypeNotSupported(_) => error_codes::CONTENT_TYPE_NOT_SUPPORTED,
            Self::QueueClosed | Self::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    pub fn to_response(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::error(id, self.code(), self.to_string())
    }
}
