// ABOUTME: Per-request authentication resolving a bearer token to a local user record
// ABOUTME: Token verification is delegated to the injected IdentityVerifier
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

use crate::auth::{extract_bearer_token, IdentityVerifier, VerifiedIdentity};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::User;
use axum::http::HeaderMap;
use std::sync::Arc;

/// Authenticates requests by verifying the bearer token with the identity
/// provider and resolving the attested email to a local user.
///
/// Handlers call [`authenticate_request`](Self::authenticate_request)
/// explicitly, so the resolved [`User`] flows through as a plain value
/// rather than request extensions.
pub struct AuthMiddleware {
    verifier: Arc<dyn IdentityVerifier>,
    database: Database,
}

impl AuthMiddleware {
    /// Create auth middleware over a verifier and the user directory
    #[must_use]
    pub fn new(verifier: Arc<dyn IdentityVerifier>, database: Database) -> Self {
        Self { verifier, database }
    }

    /// Verify the token without requiring a local user record.
    ///
    /// Used by login, which provisions the user when absent.
    ///
    /// # Errors
    ///
    /// Returns 401-mapped errors for missing/malformed/rejected tokens.
    pub async fn verify_token(&self, headers: &HeaderMap) -> AppResult<VerifiedIdentity> {
        let token = extract_bearer_token(headers)?;
        self.verifier.verify(token).await
    }

    /// Authenticate a request and return the local user it belongs to.
    ///
    /// # Errors
    ///
    /// Returns 401-mapped errors when the token is missing, malformed or
    /// rejected, when the identity carries no email, or when no local user
    /// matches the attested email.
    pub async fn authenticate_request(&self, headers: &HeaderMap) -> AppResult<User> {
        let identity = self.verify_token(headers).await?;

        let email = identity
            .email
            .ok_or_else(|| AppError::auth_invalid("Token has no verified email"))?;

        self.database
            .users()
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::auth_invalid("User not found"))
    }
}
