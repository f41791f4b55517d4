// ABOUTME: Unified error handling with stable error codes and HTTP response mapping
// ABOUTME: Every failure path in the API funnels through AppError into one response envelope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

//! # Unified Error Handling System
//!
//! This module provides the centralized error type for the Parley chat server.
//! It defines stable error codes, their HTTP status mapping, and the JSON
//! error envelope (`{"success": false, "error": {code, message, details?}}`)
//! shared by every failing endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

/// Set once at startup; controls 5xx message redaction outside development.
static PRODUCTION_MODE: OnceLock<bool> = OnceLock::new();

/// Record whether the process runs in production mode.
///
/// Called once from server bootstrap. Later calls are ignored.
pub fn set_production_mode(production: bool) {
    let _ = PRODUCTION_MODE.set(production);
}

fn is_production() -> bool {
    *PRODUCTION_MODE.get().unwrap_or(&false)
}

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication (1000-1999)
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired = 1000,
    #[serde(rename = "UNAUTHORIZED")]
    AuthInvalid = 1001,
    #[serde(rename = "AUTH_MALFORMED")]
    AuthMalformed = 1002,

    // Validation (3000-3999)
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError = 3000,
    #[serde(rename = "INVALID_ID")]
    InvalidId = 3001,

    // Resource management (4000-4999)
    #[serde(rename = "NOT_FOUND")]
    ResourceNotFound = 4000,
    #[serde(rename = "CONFLICT")]
    ResourceAlreadyExists = 4001,

    // External services (5000-5999)
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,

    // Configuration (6000-6999)
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,

    // Internal (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError = 9001,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            // 401 Unauthorized: missing, malformed, invalid or expired credentials
            Self::AuthRequired | Self::AuthInvalid | Self::AuthMalformed => {
                StatusCode::UNAUTHORIZED
            }

            // 400 Bad Request
            Self::InvalidId => StatusCode::BAD_REQUEST,

            // 422 Unprocessable Entity
            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,

            // 404 Not Found
            Self::ResourceNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::ResourceAlreadyExists => StatusCode::CONFLICT,

            // 502 Bad Gateway
            Self::ExternalServiceError => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            Self::ConfigError | Self::InternalError | Self::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Generic description used when redacting 5xx messages
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication required",
            Self::AuthInvalid => "Authentication failed",
            Self::AuthMalformed => "Malformed authentication credentials",
            Self::ValidationError => "Request validation failed",
            Self::InvalidId => "Invalid identifier format",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ResourceAlreadyExists => "The resource already exists",
            Self::ExternalServiceError => "An external service encountered an error",
            Self::ConfigError => "Configuration error encountered",
            Self::InternalError => "An internal server error occurred",
            Self::DatabaseError => "Database operation failed",
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
#[error("{}: {}", .code.description(), .message)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Structured details (for validation: `[{field, message}]`)
    pub details: Option<serde_json::Value>,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Attach structured details to the error
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Authentication required (missing header)
    pub fn auth_required(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthRequired, message)
    }

    /// Invalid or expired credentials, or no matching local user
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Malformed authorization header
    pub fn auth_malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthMalformed, message)
    }

    /// Resource not found (also used for ownership mismatches and soft-deleted rows)
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Unique-constraint conflict
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceAlreadyExists, message)
    }

    /// Request validation failure with per-field details
    pub fn validation(message: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        let details: Vec<serde_json::Value> = fields
            .iter()
            .map(|(field, msg)| serde_json::json!({"field": field, "message": msg}))
            .collect();
        Self::new(ErrorCode::ValidationError, message)
            .with_details(serde_json::Value::Array(details))
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// External service error
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Wire format of the error envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorResponseDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        // Redact 5xx messages outside development so driver/internal details
        // never reach clients
        let message = if error.http_status().is_server_error() && is_production() {
            error.code.description().to_owned()
        } else {
            error.message
        };

        Self {
            success: false,
            error: ErrorResponseDetails {
                code: error.code,
                message,
                details: error.details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, "request failed: {}", self.message);
        } else {
            tracing::debug!(code = ?self.code, "request rejected: {}", self.message);
        }
        (status, Json(ErrorResponse::from(self))).into_response()
    }
}

/// Translate driver errors at the database boundary; unique-index violations
/// become conflicts instead of leaking sqlx error shapes
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = error {
            if db_err.is_unique_violation() {
                return Self::conflict("A record with this value already exists")
                    .with_source(error);
            }
        }
        Self::database(error.to_string()).with_source(error)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(
            ErrorCode::AuthRequired.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::AuthMalformed.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::ResourceNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::ResourceAlreadyExists.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::ValidationError.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_details_shape() {
        let error = AppError::validation(
            "At least one field must be provided",
            &[("title", "Title cannot be empty")],
        );
        let details = error.details.clone().unwrap();
        assert_eq!(details[0]["field"], "title");
        assert_eq!(details[0]["message"], "Title cannot be empty");
    }

    #[test]
    fn test_error_envelope_serialization() {
        let error = AppError::conflict("Conversation ID already exists");
        let response = ErrorResponse::from(error);

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"success\":false"));
        assert!(json.contains("CONFLICT"));
        assert!(json.contains("Conversation ID already exists"));
    }
}
