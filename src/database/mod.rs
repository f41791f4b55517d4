// ABOUTME: Database management built on a shared SQLite pool with inline migrations
// ABOUTME: Per-domain manager structs expose the query surface; nothing else touches SQL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

//! # Database Management
//!
//! This module owns the connection pool and schema for the Parley chat
//! server: users, conversations, and the per-conversation message-log pair.
//! Route handlers go through the per-domain managers
//! ([`UserManager`], [`ConversationManager`], [`MessageLogManager`]).

mod conversations;
mod message_logs;
mod users;

pub use conversations::{ConversationManager, StatusFilter};
pub use message_logs::{AppendOutcome, LogRecord, MessageLogManager, NewLogEntry, StoredMessage};
pub use users::UserManager;

use crate::errors::AppError;
use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Database manager owning the pool and schema
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened or a migration statement fails.
    pub async fn new(database_url: &str) -> Result<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:")
            && !database_url.contains(":memory:")
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        // Every pooled connection to :memory: would open its own empty
        // database, so in-memory pools are pinned to a single connection
        let pool = if connection_options.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(&connection_options)
                .await?
        } else {
            SqlitePool::connect(&connection_options).await?
        };

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// User directory operations
    #[must_use]
    pub fn users(&self) -> UserManager {
        UserManager::new(self.pool.clone())
    }

    /// Conversation store operations
    #[must_use]
    pub fn conversations(&self) -> ConversationManager {
        ConversationManager::new(self.pool.clone())
    }

    /// Message-log pair operations
    #[must_use]
    pub fn message_logs(&self) -> MessageLogManager {
        MessageLogManager::new(self.pool.clone())
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Fails when a schema statement cannot be executed.
    pub async fn migrate(&self) -> Result<()> {
        self.migrate_users().await?;
        self.migrate_conversations().await?;
        self.migrate_message_logs().await?;
        Ok(())
    }

    async fn migrate_users(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn migrate_conversations(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                model_name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_conversations_user_updated
            ON conversations(user_id, updated_at DESC)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn migrate_message_logs(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS message_logs (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id),
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(conversation_id, kind)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // seq (rowid) preserves insertion order; the unique index makes
        // message id the sole identity within a log, so a concurrent
        // duplicate insert degrades to a no-op instead of a double write
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS log_messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                log_id TEXT NOT NULL REFERENCES message_logs(id),
                message_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                parts TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(log_id, message_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Translate a driver error, overriding the generic conflict message with a
/// domain-specific one when the failure is a unique-index violation
pub(crate) fn map_unique_violation(error: sqlx::Error, conflict_message: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = error {
        if db_err.is_unique_violation() {
            return AppError::conflict(conflict_message).with_source(error);
        }
    }
    AppError::from(error)
}
