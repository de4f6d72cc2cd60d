// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    /// Spotify credentials missing, or expired without a refresh token.
    #[error("Spotify not authorized: {0}")]
    NotAuthorized(String),

    /// OAuth state unknown, expired or already consumed.
    #[error("Invalid or expired authorization state")]
    InvalidState,

    /// Upstream non-2xx response or malformed payload.
    #[error("Upstream provider error: {0}")]
    ProviderError(String),

    /// Aggregation window holds no records.
    #[error("No data: {0}")]
    NoData(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the error came from an upstream service rather than from us
    /// or the caller.
    pub fn is_provider_error(&self) -> bool {
        matches!(self, AppError::ProviderError(_))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotAuthorized(msg) => (
                StatusCode::BAD_REQUEST,
                "spotify_not_authorized",
                Some(format!("{}. Please reconnect your Spotify account.", msg)),
            ),
            AppError::InvalidState => (
                StatusCode::BAD_REQUEST,
                "invalid_state",
                Some("Invalid or expired state parameter".to_string()),
            ),
            AppError::ProviderError(msg) => {
                tracing::warn!(error = %msg, "Upstream provider error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "provider_error",
                    Some(msg.clone()),
                )
            }
            AppError::NoData(msg) => (StatusCode::NOT_FOUND, "no_data", Some(msg.clone())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
