// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Internal(String),

    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Invalid version: {0}")]
    VersionError(#[from] semver::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Status codes surfaced to API clients
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    PermissionDenied,
    Internal,
}

impl ErrorCode {
    pub fn http_status(self) -> http::StatusCode {
        match self {
            ErrorCode::InvalidArgument => http::StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => http::StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists => http::StatusCode::CONFLICT,
            ErrorCode::FailedPrecondition => http::StatusCode::PRECONDITION_FAILED,
            ErrorCode::PermissionDenied => http::StatusCode::FORBIDDEN,
            ErrorCode::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl PluginError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PluginError::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        PluginError::NotFound(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            PluginError::InvalidArgument(_) | PluginError::VersionError(_) => {
                ErrorCode::InvalidArgument
            }
            PluginError::NotFound(_) => ErrorCode::NotFound,
            PluginError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            PluginError::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            PluginError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            PluginError::Internal(_) | PluginError::SerializationError(_) => ErrorCode::Internal,
            PluginError::KubeError(kube::Error::Api(resp)) => match resp.code {
                400 | 422 => ErrorCode::InvalidArgument,
                403 => ErrorCode::PermissionDenied,
                404 => ErrorCode::NotFound,
                409 => ErrorCode::AlreadyExists,
                _ => ErrorCode::Internal,
            },
            PluginError::KubeError(_) => ErrorCode::Internal,
        }
    }

    /// Attach context to an error while keeping its code
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        let msg = format!("{}: {}", ctx, self);
        match self.code() {
            ErrorCode::InvalidArgument => PluginError::InvalidArgument(msg),
            ErrorCode::NotFound => PluginError::NotFound(msg),
            ErrorCode::AlreadyExists => PluginError::AlreadyExists(msg),
            ErrorCode::FailedPrecondition => PluginError::FailedPrecondition(msg),
            ErrorCode::PermissionDenied => PluginError::PermissionDenied(msg),
            ErrorCode::Internal => PluginError::Internal(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, PluginError>;
