//! The top-level error type returned by every fallible HTTP operation.
//!
//! Domain errors (store, auth, policy) carry no HTTP status themselves;
//! they are converted into [`ApiError`] only at the HTTP boundary, and
//! [`ApiError::into_response_with`] decides what's safe to show the caller.

use std::sync::OnceLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::verifier::VerifyError;
use crate::model::grant::GrantError;
use crate::model::group::GroupError;
use crate::store::StoreError;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Set once at startup from `BENTO_DEBUG`. The blanket `IntoResponse` impl
/// below has no access to per-request state, so this is the process-wide
/// equivalent of threading `Config::debug` through every handler.
static DEBUG_MODE: OnceLock<bool> = OnceLock::new();

/// Call once, at startup, with `Config::debug`.
pub fn set_debug_mode(debug: bool) {
    let _ = DEBUG_MODE.set(debug);
}

fn debug_mode() -> bool {
    *DEBUG_MODE.get().unwrap_or(&false)
}

#[derive(thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    ValidationError(String),

    #[error("{kind} {id} not found")]
    NotFoundError { kind: &'static str, id: i64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid authentication credentials: {0}")]
    InvalidAuthentication(#[from] VerifyError),

    #[error("insufficient permission")]
    InsufficientPermissionsError,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("issuer unreachable: {0}")]
    IssuerUnreachable(String),

    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl std::fmt::Display) -> Self {
        Self::ValidationError(msg.to_string())
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "validation_error",
            ApiError::NotFoundError { .. } => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::InvalidAuthentication(_) => "authentication_error",
            ApiError::InsufficientPermissionsError => "authorization_error",
            ApiError::StoreUnavailable(_) => "store_unavailable",
            ApiError::IssuerUnreachable(_) => "issuer_unreachable",
            ApiError::UnexpectedError(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFoundError { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidAuthentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientPermissionsError => StatusCode::FORBIDDEN,
            ApiError::StoreUnavailable(_) | ApiError::IssuerUnreachable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the wire body, hiding `UnexpectedError` detail unless `debug`
    /// is set. The blanket `IntoResponse` impl below calls this with the
    /// process-wide [`debug_mode`] set from `BENTO_DEBUG` at startup.
    pub fn into_response_with(self, debug: bool) -> Response {
        let status = self.status();
        tracing::error!(code = self.code(), status = status.as_u16(), "{self:?}");

        let message = match (&self, debug) {
            (ApiError::UnexpectedError(err), true) => format!("{err:#}"),
            (ApiError::UnexpectedError(_), false) => "internal error".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => ApiError::NotFoundError { kind, id },
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Unavailable(msg) => ApiError::StoreUnavailable(msg),
        }
    }
}

impl From<GrantError> for ApiError {
    fn from(err: GrantError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<GroupError> for ApiError {
    fn from(err: GroupError) -> Self {
        match err {
            GroupError::DuplicateName(_) | GroupError::InUse(_) => {
                ApiError::Conflict(err.to_string())
            }
            GroupError::EmptyName => ApiError::ValidationError(err.to_string()),
        }
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with(debug_mode())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    write!(f, "{e}")?;
    let mut current = e.source();
    while let Some(cause) = current {
        write!(f, "\n\tCaused by: {cause}")?;
        current = cause.source();
    }
    Ok(())
}
