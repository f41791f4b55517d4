// ABOUTME: HTTP route handlers grouped per domain, mounted by the server module
// ABOUTME: Each group exposes a routes() constructor returning an axum Router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

//! # API Route Handlers
//!
//! Handlers stay thin: authenticate, validate, call a database manager, wrap
//! the result in the response envelope. Anything that fails returns
//! [`AppError`](crate::errors::AppError) and maps to the error envelope.

mod auth;
mod conversations;
mod health;
mod users;

pub use auth::AuthRoutes;
pub use conversations::ConversationRoutes;
pub use health::HealthRoutes;
pub use users::UserRoutes;
