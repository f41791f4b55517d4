// ABOUTME: User management endpoints: create, read, list, update, soft delete
// ABOUTME: All routes require a verified bearer token; lookups exclude deleted rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

use crate::errors::{AppError, AppResult};
use crate::pagination::{PaginatedResponse, PaginationParams};
use crate::response::ApiResponse;
use crate::server::ServerResources;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

const NAME_MAX: usize = 100;

/// User management routes
pub struct UserRoutes;

impl UserRoutes {
    /// Build the user router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/users", get(list_users).post(create_user))
            .route(
                "/api/users/:user_id",
                get(get_user).put(update_user).delete(delete_user),
            )
            .with_state(resources)
    }
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    name: Option<String>,
    email: Option<String>,
}

/// POST /api/users
async fn create_user(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<CreateUserRequest>,
) -> AppResult<Response> {
    resources.auth.authenticate_request(&headers).await?;

    let name = validate_name(&request.name)?;
    let email = validate_email(&request.email)?;

    let user = resources.database.users().create_user(name, email).await?;
    Ok(ApiResponse::created(user, "User created successfully"))
}

/// GET /api/users
async fn list_users(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Response> {
    resources.auth.authenticate_request(&headers).await?;

    let (limit, offset) = pagination.to_limit_offset()?;
    let (users, total) = resources.database.users().list_users(limit, offset).await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        users, total, pagination,
    )))
}

/// GET /api/users/:user_id
async fn get_user(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> AppResult<Response> {
    resources.auth.authenticate_request(&headers).await?;

    let user_id = parse_user_id(&user_id)?;
    let user = resources
        .database
        .users()
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(ApiResponse::ok(user))
}

/// PUT /api/users/:user_id
async fn update_user(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    axum::Json(request): axum::Json<UpdateUserRequest>,
) -> AppResult<Response> {
    resources.auth.authenticate_request(&headers).await?;

    let user_id = parse_user_id(&user_id)?;
    if request.name.is_none() && request.email.is_none() {
        return Err(AppError::validation(
            "At least one field must be provided",
            &[("body", "Provide name and/or email")],
        ));
    }

    let name = request.name.as_deref().map(validate_name).transpose()?;
    let email = request.email.as_deref().map(validate_email).transpose()?;

    let user = resources
        .database
        .users()
        .update_user(user_id, name, email)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(ApiResponse::ok_with_message(
        user,
        "User updated successfully",
    ))
}

/// DELETE /api/users/:user_id
async fn delete_user(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> AppResult<Response> {
    resources.auth.authenticate_request(&headers).await?;

    let user_id = parse_user_id(&user_id)?;
    let deleted = resources.database.users().soft_delete_user(user_id).await?;
    if !deleted {
        return Err(AppError::not_found("User"));
    }

    Ok(ApiResponse::ok_with_message(
        serde_json::json!(null),
        "User deleted successfully",
    ))
}

fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        AppError::new(
            crate::errors::ErrorCode::InvalidId,
            "User ID must be a valid UUID",
        )
    })
}

fn validate_name(name: &str) -> AppResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.len() > NAME_MAX {
        return Err(AppError::validation(
            "Invalid name",
            &[("name", "Name must be between 1 and 100 characters")],
        ));
    }
    Ok(trimmed)
}

fn validate_email(email: &str) -> AppResult<&str> {
    let trimmed = email.trim();
    // Intentionally shallow: the identity provider is the email authority
    let valid = trimmed.len() >= 3
        && trimmed.contains('@')
        && !trimmed.starts_with('@')
        && !trimmed.ends_with('@');
    if !valid {
        return Err(AppError::validation(
            "Invalid email",
            &[("email", "Email must be a valid address")],
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds() {
        assert!(validate_name("  Jordan  ").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("@b.com").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("not-an-email").is_err());
    }
}
