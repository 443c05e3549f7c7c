use crate::storage::CatalogError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use download_tasks::{LibraryStorageError, RequestDownloadError};
use music_api::{MusicApiError, RawResponse};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error("missing parameters")]
    MissingParameters,
    #[error("invalid parameters")]
    InvalidParameters,
    #[error("request failed")]
    Upstream(#[source] MusicApiError),
    #[error("failed to parse response")]
    MalformedResponse(#[source] MusicApiError),
    #[error("{0}")]
    Storage(&'static str, #[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    pub(crate) fn storage(message: &'static str) -> impl FnOnce(CatalogError) -> ApiError {
        move |error| ApiError::Storage(message, Box::new(error))
    }
}

impl From<MusicApiError> for ApiError {
    fn from(error: MusicApiError) -> Self {
        match error {
            MusicApiError::ParseError(_) => ApiError::MalformedResponse(error),
            MusicApiError::ReqwestError(_) => ApiError::Upstream(error),
        }
    }
}

impl From<RequestDownloadError> for ApiError {
    fn from(error: RequestDownloadError) -> Self {
        match error {
            RequestDownloadError::MissingParameter(_) => ApiError::MissingParameters,
            RequestDownloadError::LibraryStorageError(error) => {
                ApiError::Storage("failed to read library", Box::new(error))
            }
        }
    }
}

impl From<LibraryStorageError> for ApiError {
    fn from(error: LibraryStorageError) -> Self {
        ApiError::Storage("failed to refresh library", Box::new(error))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingParameters | ApiError::InvalidParameters => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = ?self, "Request failed");
        } else {
            warn!(error = %self, "Rejected request");
        }

        HttpResponse::build(status).json(json!({
            "code": status.as_u16(),
            "message": self.to_string(),
        }))
    }
}

pub(crate) fn with_data(data: impl Serialize) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "code": 200, "data": data }))
}

pub(crate) fn with_message(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "code": 200, "message": message }))
}

/// Forwards an upstream answer with its status code and body untouched.
pub(crate) fn passthrough(response: RawResponse) -> HttpResponse {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    HttpResponse::build(status)
        .content_type("application/json")
        .body(response.body)
}
