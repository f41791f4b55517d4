// ABOUTME: Configuration module grouping environment-driven settings
// ABOUTME: All runtime configuration is read from environment variables at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

/// Environment-based server configuration
pub mod environment;
