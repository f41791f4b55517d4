// ABOUTME: Bearer-token verification against the external identity provider
// ABOUTME: IdentityVerifier is the trait seam; tests inject fakes instead of calling out
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

//! Identity verification for incoming requests.
//!
//! Tokens are never issued or validated locally; the server forwards them to
//! the identity provider and trusts the verified email it returns. The local
//! user record is looked up from that email by the auth middleware.

use crate::config::environment::IdentityConfig;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Deserialize;

/// Default Identity Toolkit endpoint for token lookup
const DEFAULT_LOOKUP_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

/// Identity attested by the provider for a verified token
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// Provider-side user id
    pub uid: String,
    /// Verified email address; absent for anonymous/phone-only accounts
    pub email: Option<String>,
}

/// Capability seam for bearer-token verification
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a bearer token and return the identity it belongs to
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` for rejected/expired tokens and
    /// `ExternalServiceError` when the provider cannot be reached.
    async fn verify(&self, token: &str) -> AppResult<VerifiedIdentity>;
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The header must contain exactly two space-separated tokens with a
/// `Bearer` scheme; anything else is malformed.
///
/// # Errors
///
/// Returns `AuthRequired` when the header is missing and `AuthMalformed`
/// when it does not match the expected shape.
pub fn extract_bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let header = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::auth_required("Authorization header is missing"))?;

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AppError::auth_malformed(
            "Invalid authorization header format. Use: Bearer <token>",
        )),
    }
}

/// Identity verifier backed by the Google Identity Toolkit REST API
pub struct GoogleIdentityVerifier {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
struct LookupUser {
    #[serde(rename = "localId")]
    local_id: String,
    email: Option<String>,
}

impl GoogleIdentityVerifier {
    /// Build a verifier from identity-provider credentials
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_LOOKUP_ENDPOINT.to_owned()),
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityVerifier {
    async fn verify(&self, token: &str) -> AppResult<VerifiedIdentity> {
        let response = self
            .client
            .post(format!("{}?key={}", self.endpoint, self.api_key))
            .json(&serde_json::json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| AppError::external_service("identity provider", e.to_string()))?;

        // The provider answers 400 for rejected tokens; anything else
        // unexpected is a provider-side failure, not a client failure
        if response.status().is_client_error() {
            return Err(AppError::auth_invalid("Invalid or expired token"));
        }
        if !response.status().is_success() {
            return Err(AppError::external_service(
                "identity provider",
                format!("lookup returned status {}", response.status()),
            ));
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| AppError::external_service("identity provider", e.to_string()))?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AppError::auth_invalid("Invalid or expired token"))?;

        Ok(VerifiedIdentity {
            uid: user.local_id,
            email: user.email,
        })
    }
}
