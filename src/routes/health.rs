// ABOUTME: Unauthenticated health endpoint for load balancers and deploy checks
// ABOUTME: Reports process liveness plus the running environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

use crate::response::ApiResponse;
use crate::server::ServerResources;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use std::sync::Arc;

/// Health check routes
pub struct HealthRoutes;

impl HealthRoutes {
    /// Build the health router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        // Bare /health stays for load balancers that don't know the prefix
        Router::new()
            .route("/api/health", get(health_check))
            .route("/health", get(health_check))
            .with_state(resources)
    }
}

async fn health_check(State(resources): State<Arc<ServerResources>>) -> Response {
    ApiResponse::ok(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "environment": resources.config.environment.to_string(),
    }))
}
