// ABOUTME: HTTP server assembly: shared resources, router composition and middleware layers
// ABOUTME: Holds the only ServerResources constructor; tests build routers through it too
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

//! Server composition root.
//!
//! [`ServerResources`] bundles everything handlers need (database, auth,
//! config) behind one `Arc` so route modules receive a single state type.
//! [`HttpServer`] assembles the routers and runs the listener.

use crate::config::environment::ServerConfig;
use crate::database::Database;
use crate::errors::AppError;
use crate::middleware::AuthMiddleware;
use crate::routes::{AuthRoutes, ConversationRoutes, HealthRoutes, UserRoutes};
use anyhow::Result;
use axum::http::HeaderValue;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared resources for all route handlers
pub struct ServerResources {
    pub database: Database,
    pub auth: AuthMiddleware,
    pub config: ServerConfig,
}

impl ServerResources {
    /// Bundle the shared server state
    #[must_use]
    pub fn new(database: Database, auth: AuthMiddleware, config: ServerConfig) -> Self {
        Self {
            database,
            auth,
            config,
        }
    }
}

/// HTTP server over the composed API routers
pub struct HttpServer {
    resources: Arc<ServerResources>,
}

impl HttpServer {
    /// Create a server over shared resources
    #[must_use]
    pub fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Compose the full application router with middleware layers
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .merge(HealthRoutes::routes(self.resources.clone()))
            .merge(AuthRoutes::routes(self.resources.clone()))
            .merge(UserRoutes::routes(self.resources.clone()))
            .merge(ConversationRoutes::routes(self.resources.clone()))
            .fallback(route_not_found)
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(cors_layer(&self.resources.config.cors_origin))
    }

    /// Bind and serve until the process is stopped
    ///
    /// # Errors
    ///
    /// Fails when the port cannot be bound or the listener errors.
    pub async fn serve(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.resources.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("listening on {addr}");

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

/// Unmatched routes answer with the standard error envelope instead of an
/// empty 404 body
async fn route_not_found() -> AppError {
    AppError::not_found("Route")
}

fn cors_layer(cors_origin: &str) -> CorsLayer {
    if cors_origin.trim() == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = cors_origin
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
