use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::{Error, ErrorType};

/// HTTP response builder for Error enum
impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error_type {
            ErrorType::LabelMe => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorType::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ErrorType::TokenExpired => StatusCode::UNAUTHORIZED,

            ErrorType::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ErrorType::LocalCooldown { .. } => StatusCode::TOO_MANY_REQUESTS,

            ErrorType::UpstreamError { .. } => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorType::StorageFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(&self)).into_response()
    }
}
