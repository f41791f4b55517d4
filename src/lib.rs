// ABOUTME: Library root for the Parley chat server
// ABOUTME: Declares the module tree; the binary and integration tests build on these exports
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

//! # Parley Chat Server
//!
//! REST backend for user accounts and AI-chat conversation persistence.
//! Each conversation keeps two parallel message logs: a `user_context` log
//! of UI-shaped messages and an `agent_context` log of model-shaped
//! messages. Appends to either log are idempotent per message id.
//!
//! Authentication delegates to an external identity provider; the server
//! verifies bearer tokens and maps verified emails to local user records.

pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod server;
