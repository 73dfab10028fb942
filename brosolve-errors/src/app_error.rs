use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transaction kept conflicting after {0} attempts")]
    TransactionConflict(u32),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Rate limited, retry in {0} seconds")]
    RateLimited(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated(_) => "Unauthorized - Please log in".to_string(),
            Self::Forbidden(msg) => msg.clone(),
            Self::InvalidRequest(msg) => msg.clone(),
            Self::NotFound(what) => format!("{} not found", what),
            Self::TransactionConflict(_) => "Failed to process vote".to_string(),
            Self::StoreUnavailable(_) => "Service temporarily unavailable. Try again.".to_string(),
            Self::RateLimited(secs) => format!("Too many requests. Wait {} seconds.", secs),
            Self::Internal(_) => "Something went wrong on the server. Try again later.".to_string(),
        }
    }

    /// Client errors are never retried and leave no trace in the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated(_)
                | Self::Forbidden(_)
                | Self::InvalidRequest(_)
                | Self::NotFound(_)
                | Self::RateLimited(_)
        )
    }
}

#[cfg(feature = "server")]
mod server_impl {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;

    #[derive(serde::Serialize)]
    struct ErrorResponse {
        error: String,
    }

    impl AppError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                AppError::Forbidden(_) => StatusCode::FORBIDDEN,
                AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                AppError::NotFound(_) => StatusCode::NOT_FOUND,
                AppError::TransactionConflict(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            (
                status,
                Json(ErrorResponse {
                    error: self.user_message(),
                }),
            )
                .into_response()
        }
    }
}
