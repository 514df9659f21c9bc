//! Error taxonomy for the task runtime.
//!
//! Mirrors the shape of a protocol-facing error type: a closed set of
//! named variants, a `.code()` accessor giving the wire string for each,
//! and (behind the `server` feature) a direct `IntoResponse` impl so
//! handlers can simply return `Result<T, RuntimeError>`.

use serde::Serialize;

/// A single validation failure, as produced by the schema layer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Issue {
    /// JSON-pointer-ish path to the offending value, e.g. `"/text"`.
    pub path: String,
    /// Machine-readable issue code, e.g. `"type"`, `"required"`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// The closed error taxonomy for the task runtime.
///
/// Every variant maps to exactly one wire code (`.code()`) and, on the
/// server, exactly one HTTP status (`.status()`).
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("invalid input ({} issue(s))", issues.len())]
    InvalidInput { issues: Vec<Issue> },

    #[error("invalid output ({} issue(s))", issues.len())]
    InvalidOutput { issues: Vec<Issue> },

    #[error("skill not found: {key}")]
    SkillNotFound { key: String },

    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    #[error("not implemented: {message}")]
    NotImplemented { message: String },

    #[error("invalid task state: {message}")]
    InvalidState { message: String },

    #[error("stream not supported for skill: {key}")]
    StreamNotSupported { key: String },

    #[error("internal error: {message}")]
    InternalError { message: String },

    #[error("parse error: {message}")]
    ParseError { message: String },

    /// Raised by [`crate::skill::SkillRegistry::add`] at setup time —
    /// never reaches the wire.
    #[error("duplicate skill: {key}")]
    DuplicateSkill { key: String },

    /// Raised by [`crate::skill::SkillRegistry::add`] at setup time —
    /// never reaches the wire.
    #[error("invalid skill definition: {reason}")]
    InvalidSkill { reason: String },

    // ---- client-side transport errors ----
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("failed to fetch agent card: {0}")]
    CardFetchFailed(String),
}

impl RuntimeError {
    /// The wire-level error code, used in the `{error: {code, message?,
    /// details?}}` response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidInput { .. } => "invalid_input",
            Self::InvalidOutput { .. } => "invalid_output",
            Self::SkillNotFound { .. } => "skill_not_found",
            Self::TaskNotFound { .. } => "task_not_found",
            Self::NotImplemented { .. } => "not_implemented",
            Self::InvalidState { .. } => "invalid_state",
            Self::StreamNotSupported { .. } => "stream_not_supported",
            Self::InternalError { .. } => "internal_error",
            Self::ParseError { .. } => "parse_error",
            Self::DuplicateSkill { .. } => "duplicate_skill",
            Self::InvalidSkill { .. } => "invalid_skill",
            Self::Transport(_) => "transport_error",
            Self::Timeout(_) => "timeout",
            Self::Http { .. } => "http_error",
            Self::InvalidJson(_) => "invalid_json",
            Self::CardFetchFailed(_) => "card_fetch_failed",
        }
    }

    /// Structured details to attach to the error body, if any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InvalidInput { issues } | Self::InvalidOutput { issues } => {
                serde_json::to_value(issues).ok()
            }
            _ => None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

#[cfg(feature = "server")]
impl RuntimeError {
    /// The HTTP status this error surfaces as.
    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidRequest { .. }
            | Self::InvalidInput { .. }
            | Self::InvalidState { .. }
            | Self::StreamNotSupported { .. }
            | Self::ParseError { .. } => StatusCode::BAD_REQUEST,
            Self::SkillNotFound { .. } | Self::TaskNotFound { .. } => StatusCode::NOT_FOUND,
            Self::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            Self::InternalError { .. } | Self::InvalidOutput { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            // Construction-time errors never reach a response; fall back
            // to 500 rather than panic if one ever does leak through.
            Self::DuplicateSkill { .. } | Self::InvalidSkill { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Transport(_) | Self::Timeout(_) | Self::InvalidJson(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Http { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::CardFetchFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(feature = "server")]
impl axum::response::IntoResponse for RuntimeError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.status();
        let body = serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "details": self.details(),
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: err.to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
