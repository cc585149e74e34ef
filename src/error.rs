use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    /// The named resource (product, cart, cart item, order, user) does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Not enough stock available for {product}")]
    InsufficientStock { product: String },

    /// Missing or invalid credentials.
    #[error("Not authorized, {0}")]
    Unauthenticated(&'static str),

    /// Authenticated, but the resource belongs to someone else.
    #[error("Not authorized")]
    Unauthorized,

    #[error("Not authorized as an admin")]
    Forbidden,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::InsufficientStock { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthenticated(_) | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                AppError::DbError(err) => tracing::error!(error = %err, "database error"),
                AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
                AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
                _ => {}
            }
        }

        let message = self.to_string();
        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(AppError::NotFound("Product").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::validation("No order items").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InsufficientStock {
                product: "Mug".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(AppError::NotFound("Order").to_string(), "Order not found");
        assert_eq!(
            AppError::Unauthenticated("no token").to_string(),
            "Not authorized, no token"
        );
        assert_eq!(
            AppError::InsufficientStock {
                product: "Ferris Mug".into()
            }
            .to_string(),
            "Not enough stock available for Ferris Mug"
        );
    }
}
