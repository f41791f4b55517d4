// ABOUTME: Success response envelope shared by all API endpoints
// ABOUTME: Wraps handler payloads in {success: true, data, message?} with the right status
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Success envelope returned by every non-failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap a payload without a message
    pub const fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    /// Wrap a payload with a human-readable message
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }

    /// 200 OK response
    pub fn ok(data: T) -> Response {
        (StatusCode::OK, Json(Self::new(data))).into_response()
    }

    /// 200 OK response with a message
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Response {
        (StatusCode::OK, Json(Self::with_message(data, message))).into_response()
    }

    /// 201 Created response with a message
    pub fn created(data: T, message: impl Into<String>) -> Response {
        (StatusCode::CREATED, Json(Self::with_message(data, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_omits_absent_message() {
        let json = serde_json::to_string(&ApiResponse::new(serde_json::json!({"id": 1}))).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(!json.contains("message"));
    }

    #[test]
    fn test_envelope_includes_message() {
        let json = serde_json::to_string(&ApiResponse::with_message(
            serde_json::json!(null),
            "Conversation created successfully",
        ))
        .unwrap();
        assert!(json.contains("Conversation created successfully"));
    }
}
