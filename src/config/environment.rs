// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses environment variables into typed config; the process refuses to start without credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

//! Environment-based configuration management for production deployment

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment type controlling error redaction and log defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// SQLite database with file path
    SQLite { path: PathBuf },
    /// In-memory SQLite (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string with validation
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path_str = s.strip_prefix("sqlite:").unwrap_or(s);
        if path_str == ":memory:" {
            Self::Memory
        } else {
            Self::SQLite {
                path: PathBuf::from(path_str),
            }
        }
    }

    /// Convert to an sqlx connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }
}

/// Identity-provider credentials for bearer-token verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// API key passed to the Identity Toolkit `accounts:lookup` endpoint
    pub api_key: String,
    /// Endpoint override, used by tests and self-hosted emulators
    pub endpoint: Option<String>,
}

impl IdentityConfig {
    /// Load credentials from the environment
    ///
    /// # Errors
    ///
    /// Fails when `IDENTITY_API_KEY` is unset; token verification cannot work
    /// without it and the server must not start.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("IDENTITY_API_KEY")
            .context("IDENTITY_API_KEY must be set to verify bearer tokens")?;
        Ok(Self {
            api_key,
            endpoint: env::var("IDENTITY_ENDPOINT").ok(),
        })
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Database location
    pub database_url: DatabaseUrl,
    /// Allowed CORS origins (`*` or comma-separated list)
    pub cors_origin: String,
    /// Deployment environment
    pub environment: Environment,
    /// Identity-provider credentials
    pub identity: IdentityConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Fails when a variable is present but unparseable, or when required
    /// identity-provider credentials are missing.
    pub fn from_env() -> Result<Self> {
        let http_port = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse::<u16>()
            .context("HTTP_PORT must be a valid port number")?;

        let database_url = DatabaseUrl::parse_url(
            &env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:data/parley.db".into()),
        );

        let environment = Environment::from_str_or_default(
            &env::var("ENVIRONMENT")
                .or_else(|_| env::var("NODE_ENV"))
                .unwrap_or_else(|_| "development".into()),
        );

        Ok(Self {
            http_port,
            database_url,
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".into()),
            environment,
            identity: IdentityConfig::from_env()?,
        })
    }

    /// One-line startup summary; never includes credentials
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "environment={} port={} database={}",
            self.environment,
            self.http_port,
            self.database_url.to_connection_string()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("prod"),
            Environment::Production
        );
        assert_eq!(
            Environment::from_str_or_default("unknown"),
            Environment::Development
        );
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_database_url_parsing() {
        assert_eq!(
            DatabaseUrl::parse_url("sqlite::memory:").to_connection_string(),
            "sqlite::memory:"
        );
        assert_eq!(
            DatabaseUrl::parse_url("sqlite:data/app.db").to_connection_string(),
            "sqlite:data/app.db"
        );
        assert_eq!(
            DatabaseUrl::parse_url("data/app.db").to_connection_string(),
            "sqlite:data/app.db"
        );
    }
}
