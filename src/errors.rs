use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::bookings::BookingError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    /// No backing store connection yet; mutations are refused while reads
    /// keep serving the last-known (or default) snapshot.
    #[error("store not connected")]
    StoreUnavailable,

    /// Payment captured but the booking never reached the store. Carries
    /// the collaborator's reference for manual reconciliation.
    #[error("payment {reference} captured but booking could not be recorded")]
    PaymentUnrecorded { reference: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound => AppError::NotFound("booking".to_string()),
            BookingError::PaymentUnrecorded { reference, .. } => {
                AppError::PaymentUnrecorded { reference }
            }
            BookingError::Store(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::PaymentUnrecorded { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        // The payment-captured-but-unrecorded case must hand the client its
        // reference and is not dismissible as a transient failure.
        let body = match &self {
            AppError::PaymentUnrecorded { reference } => serde_json::json!({
                "error": self.to_string(),
                "critical": true,
                "payment_reference": reference,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        (status, axum::Json(body)).into_response()
    }
}
