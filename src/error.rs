//! Error handling and custom error types
//!
//! Provides unified error handling across the relay using thiserror. Every
//! variant maps to a client-facing [`ErrorCode`], and the HTTP layer renders
//! errors as a structured `{errorCode, message}` body instead of letting a
//! fault escape the exchange.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Provider rejected the generation request (status {status}): {body}")]
    SubmissionRejected { status: u16, body: String },

    #[error("Provider accepted the request but returned no task id: {0}")]
    MissingTaskId(String),

    #[error("Provider connection error: {0}")]
    Transport(String),

    #[error("Generation failed: {0}")]
    ProviderReportedFailure(String),

    #[error("Generation did not finish after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

/// Client-facing error vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    UploadFail,
    AiReject,
    NoTaskId,
    AiConnErr,
    AiFailed,
    Timeout,
    Internal,
}

impl ErrorCode {
    pub fn http_status(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::UploadFail
            | ErrorCode::AiReject
            | ErrorCode::NoTaskId
            | ErrorCode::AiConnErr
            | ErrorCode::AiFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Upload(_) => ErrorCode::UploadFail,
            Error::SubmissionRejected { .. } => ErrorCode::AiReject,
            Error::MissingTaskId(_) => ErrorCode::NoTaskId,
            Error::Transport(_) => ErrorCode::AiConnErr,
            Error::ProviderReportedFailure(_) => ErrorCode::AiFailed,
            Error::Timeout { .. } => ErrorCode::Timeout,
            Error::InvalidRequest(_) => ErrorCode::BadRequest,
            Error::Config(_) | Error::EnvVar(_) | Error::Serialization(_) => ErrorCode::Internal,
        }
    }

    /// Message safe to hand back to the client.
    ///
    /// Provider rejection bodies and internal details are logged, not echoed.
    pub fn client_message(&self) -> String {
        match self {
            Error::SubmissionRejected { status, .. } => {
                format!("Generation provider rejected the request (status {})", status)
            }
            Error::MissingTaskId(_) => {
                "Generation provider accepted the request but returned no task id".to_string()
            }
            Error::Config(_) | Error::EnvVar(_) | Error::Serialization(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Wire shape of every failure response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_code: ErrorCode,
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let code = self.code();
        match code {
            ErrorCode::BadRequest => tracing::debug!("Rejecting client request: {}", self),
            ErrorCode::Internal => tracing::error!("Internal error: {}", self),
            _ => tracing::warn!("Request failed ({:?}): {}", code, self),
        }

        let body = ErrorBody {
            error_code: code,
            message: self.client_message(),
        };
        (code.http_status(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
