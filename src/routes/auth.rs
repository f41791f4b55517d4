// ABOUTME: Login and session-introspection endpoints backed by the identity provider
// ABOUTME: Login auto-provisions a local user from the token's verified email
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

use crate::errors::{AppError, AppResult};
use crate::response::ApiResponse;
use crate::server::ServerResources;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Authentication routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Build the auth router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/me", get(me))
            .with_state(resources)
    }
}

/// Optional login body; `name` overrides the default for first-time users
#[derive(Debug, Default, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    name: Option<String>,
}

/// POST /api/auth/login
///
/// Verifies the bearer token and resolves it to a local user, creating one
/// when the verified email has never been seen. Registration answers 201,
/// a repeat login 200. A concurrent first login loses the insert race on
/// the unique email index and falls back to the existing row.
async fn login(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    body: Option<Json<LoginRequest>>,
) -> AppResult<Response> {
    let identity = resources.auth.verify_token(&headers).await?;
    let email = identity
        .email
        .ok_or_else(|| AppError::auth_invalid("Token has no verified email"))?;

    let users = resources.database.users();

    if let Some(user) = users.get_user_by_email(&email).await? {
        return Ok(ApiResponse::ok_with_message(user, "Login successful"));
    }

    let requested_name = body
        .map(|Json(request)| request.name)
        .unwrap_or_default()
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty());
    let name = requested_name.unwrap_or_else(|| default_name_from_email(&email));
    match users.create_user(&name, &email).await {
        Ok(user) => {
            info!(user_id = %user.id, "provisioned new user on first login");
            Ok(ApiResponse::created(user, "User registered successfully"))
        }
        Err(err) if err.code == crate::errors::ErrorCode::ResourceAlreadyExists => {
            let user = users
                .get_user_by_email(&email)
                .await?
                .ok_or_else(|| AppError::auth_invalid("User not found"))?;
            Ok(ApiResponse::ok_with_message(user, "Login successful"))
        }
        Err(err) => Err(err),
    }
}

/// GET /api/auth/me
async fn me(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let user = resources.auth.authenticate_request(&headers).await?;
    Ok(ApiResponse::ok(user))
}

/// Default display name for auto-provisioned accounts: the email local part
fn default_name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name_is_local_part() {
        assert_eq!(default_name_from_email("jordan@example.com"), "jordan");
        assert_eq!(default_name_from_email("no-at-sign"), "no-at-sign");
    }
}
