use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    Reverted,
    Destroyed,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct RpcException {
    pub code: ErrorCode,
    pub message: String,
}

impl RpcException {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn reverted(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Reverted, reason)
    }
}

impl From<RpcException> for RpcError {
    fn from(value: RpcException) -> Self {
        Self {
            code: value.code,
            message: value.message,
        }
    }
}

impl From<RpcError> for RpcException {
    fn from(value: RpcError) -> Self {
        Self {
            code: value.code,
            message: value.message,
        }
    }
}
