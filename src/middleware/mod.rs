// ABOUTME: Request-processing middleware shared by protected route handlers
// ABOUTME: Auth is invoked explicitly per handler instead of as a router layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

mod auth;

pub use auth::AuthMiddleware;
