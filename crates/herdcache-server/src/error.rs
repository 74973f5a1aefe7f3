use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use herdcache_core::CacheError;
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    /// Parametros invalidos
    BadRequest(String),

    /// Error de la cache o de sus dependencias
    Cache(CacheError),
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        Self::Cache(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after = None;

        let (status, error, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", msg),
            AppError::Cache(err) => {
                let status = match &err {
                    CacheError::SourceUnavailable { .. } | CacheError::StoreUnavailable { .. } => {
                        StatusCode::SERVICE_UNAVAILABLE
                    },
                    CacheError::LockUnavailable { waited, .. } => {
                        retry_after = Some(waited.as_secs().max(1));
                        StatusCode::SERVICE_UNAVAILABLE
                    },
                    CacheError::MalformedPayload { .. } | CacheError::Internal(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    },
                };
                let error = status.canonical_reason().unwrap_or("Error");
                (status, error, err.to_string())
            },
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        let mut response = (status, body).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}
