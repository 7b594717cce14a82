//! API error mapping
//!
//! Every failure here is per-request: the handler returns an error response
//! and the service stays up, ready for a retry with a new file. Detail goes
//! to the log; clients get a stable message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;
use tracing::warn;

use rbdash_core::apk::ApkError;
use rbdash_core::log::LogError;

use crate::routes::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Upload rejected before any parse work: wrong content type/extension
    #[error("expected an Android package upload (content type application/vnd.android.package-archive or a .apk file)")]
    InvalidFileType,

    /// Upload could not be parsed as an Android package
    #[error("could not parse the uploaded file as an Android package")]
    Format(#[source] ApkError),

    /// The build log could not be fetched
    #[error("the build log is currently unavailable, please retry later")]
    Transport(#[source] LogError),

    /// Request referenced an unknown resource
    #[error("{0}")]
    NotFound(String),

    /// Request was syntactically unacceptable
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("internal error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidFileType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Format(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Transport(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApkError> for ApiError {
    fn from(err: ApkError) -> Self {
        ApiError::Format(err)
    }
}

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::UnknownApp(appid) => {
                ApiError::NotFound(format!("application '{appid}' is not tracked"))
            }
            other => ApiError::Transport(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("request failed: {:?}", self);
        (
            self.status(),
            Json(ApiResponse::<()>::failure(self.to_string())),
        )
            .into_response()
    }
}
