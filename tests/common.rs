// ABOUTME: Shared test setup: in-memory database, fake identity verifier and user creation
// ABOUTME: Tokens follow the "valid-<email>" convention so tests pick their identity inline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use anyhow::Result;
use async_trait::async_trait;
use parley_chat_server::{
    auth::{IdentityVerifier, VerifiedIdentity},
    config::environment::{DatabaseUrl, Environment, IdentityConfig, ServerConfig},
    database::Database,
    errors::{AppError, AppResult},
    middleware::AuthMiddleware,
    models::User,
    server::{HttpServer, ServerResources},
};
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .init();
    });
}

/// Identity verifier that derives the identity from the token text.
///
/// `valid-<email>` verifies as that email, `no-email` verifies without an
/// email, everything else is rejected.
pub struct FakeIdentityVerifier;

#[async_trait]
impl IdentityVerifier for FakeIdentityVerifier {
    async fn verify(&self, token: &str) -> AppResult<VerifiedIdentity> {
        if token == "no-email" {
            return Ok(VerifiedIdentity {
                uid: "anonymous-uid".to_owned(),
                email: None,
            });
        }
        match token.strip_prefix("valid-") {
            Some(email) if !email.is_empty() => Ok(VerifiedIdentity {
                uid: format!("uid-{email}"),
                email: Some(email.to_owned()),
            }),
            _ => Err(AppError::auth_invalid("Invalid or expired token")),
        }
    }
}

/// Configuration for tests; never read from the environment
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        database_url: DatabaseUrl::Memory,
        cors_origin: "*".to_owned(),
        environment: Environment::Testing,
        identity: IdentityConfig {
            api_key: "test-key".to_owned(),
            endpoint: None,
        },
    }
}

/// Standard test resources over an in-memory database and fake verifier
pub async fn create_test_server_resources() -> Result<Arc<ServerResources>> {
    init_test_logging();
    let database = Database::new("sqlite::memory:").await?;
    let auth = AuthMiddleware::new(Arc::new(FakeIdentityVerifier), database.clone());
    Ok(Arc::new(ServerResources::new(
        database,
        auth,
        test_config(),
    )))
}

/// Full application router for end-to-end route tests
pub fn test_router(resources: &Arc<ServerResources>) -> axum::Router {
    HttpServer::new(resources.clone()).router()
}

/// Create a user directly in the database
pub async fn create_test_user(resources: &Arc<ServerResources>, email: &str) -> Result<User> {
    let user = resources
        .database
        .users()
        .create_user("Test User", email)
        .await?;
    Ok(user)
}

/// Authorization header value accepted by the fake verifier for this email
pub fn bearer(email: &str) -> String {
    format!("Bearer valid-{email}")
}
