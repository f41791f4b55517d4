// ABOUTME: Message-log pair storage and the append/dedup engine at the core of the service
// ABOUTME: Message id is the sole identity within a log; appends are idempotent by construction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

//! Append/sync engine for the per-conversation message-log pair.
//!
//! Each conversation owns one log per [`LogKind`]. A log is one
//! `message_logs` row plus its ordered `log_messages` rows (insertion order,
//! never reordered). The engine deduplicates strictly by message id: a
//! resubmission with a known id is skipped no matter what its content says,
//! which is what makes client retries converge after partial failures.

use crate::errors::AppResult;
use crate::models::LogKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

/// A normalized message ready for insertion, shape-agnostic across log kinds.
///
/// UI messages carry `parts` as a serialized JSON array; agent messages keep
/// their opaque payload serialized in `content`.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub message_id: String,
    pub role: String,
    pub content: String,
    pub parts: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A message as stored in a log
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub message_id: String,
    pub role: String,
    pub content: String,
    pub parts: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One log document: metadata plus ordered content
#[derive(Debug)]
pub struct LogRecord {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub kind: LogKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<StoredMessage>,
}

/// Result of one append call
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AppendOutcome {
    /// Messages actually written by this call
    pub appended: i64,
    /// Messages dropped because their id was already present
    pub skipped: i64,
    /// Log size after the append
    pub total: i64,
}

/// Message-log operations manager
pub struct MessageLogManager {
    pool: SqlitePool,
}

fn map_message(row: &SqliteRow) -> StoredMessage {
    StoredMessage {
        message_id: row.get("message_id"),
        role: row.get("role"),
        content: row.get("content"),
        parts: row.get("parts"),
        created_at: row.get("created_at"),
    }
}

impl MessageLogManager {
    /// Create a new message-log manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Materialize the log row for `(conversation, kind)` if absent and
    /// return its id. Upsert semantics: logs are created lazily on first
    /// message when conversation creation predates this schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn ensure_log(&self, conversation_pk: Uuid, kind: LogKind) -> AppResult<Uuid> {
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO message_logs (id, conversation_id, kind, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT(conversation_id, kind) DO NOTHING
            ",
        )
        .bind(Uuid::new_v4())
        .bind(conversation_pk)
        .bind(kind.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            r"
            SELECT id FROM message_logs WHERE conversation_id = $1 AND kind = $2
            ",
        )
        .bind(conversation_pk)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    /// Append a batch to one log, deduplicating by message id only.
    ///
    /// New messages keep the batch's relative order. The `(log_id,
    /// message_id)` unique index backs the in-memory id check, so a
    /// concurrent append racing the same id degrades to a skip rather than a
    /// duplicate row or an error. The log's `updated_at` is touched only
    /// when something was actually written.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    pub async fn append(
        &self,
        conversation_pk: Uuid,
        kind: LogKind,
        entries: &[NewLogEntry],
    ) -> AppResult<AppendOutcome> {
        let log_id = self.ensure_log(conversation_pk, kind).await?;
        let existing = self.existing_message_ids(log_id).await?;

        let mut appended: i64 = 0;
        let mut seen = existing;

        for entry in entries {
            // id-only dedup: same id with different content is silently
            // dropped, never merged or replaced
            if !seen.insert(entry.message_id.clone()) {
                continue;
            }

            let result = sqlx::query(
                r"
                INSERT INTO log_messages (log_id, message_id, role, content, parts, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT(log_id, message_id) DO NOTHING
                ",
            )
            .bind(log_id)
            .bind(&entry.message_id)
            .bind(&entry.role)
            .bind(&entry.content)
            .bind(&entry.parts)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await?;

            appended += i64::try_from(result.rows_affected()).unwrap_or(0);
        }

        if appended > 0 {
            sqlx::query(
                r"
                UPDATE message_logs SET updated_at = $1 WHERE id = $2
                ",
            )
            .bind(Utc::now())
            .bind(log_id)
            .execute(&self.pool)
            .await?;
        }

        let total = self.message_count(log_id).await?;
        let batch_len = i64::try_from(entries.len()).unwrap_or(0);

        Ok(AppendOutcome {
            appended,
            skipped: batch_len - appended,
            total,
        })
    }

    /// Load one log with its full content in insertion order
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_log(
        &self,
        conversation_pk: Uuid,
        kind: LogKind,
    ) -> AppResult<Option<LogRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, conversation_id, created_at, updated_at
            FROM message_logs
            WHERE conversation_id = $1 AND kind = $2
            ",
        )
        .bind(conversation_pk)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let log_id: Uuid = row.get("id");
        let messages = sqlx::query(
            r"
            SELECT message_id, role, content, parts, created_at
            FROM log_messages
            WHERE log_id = $1
            ORDER BY seq ASC
            ",
        )
        .bind(log_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(LogRecord {
            id: log_id,
            conversation_id: row.get("conversation_id"),
            kind,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            messages: messages.iter().map(map_message).collect(),
        }))
    }

    /// Ids already present in a log
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn existing_message_ids(&self, log_id: Uuid) -> AppResult<HashSet<String>> {
        let rows = sqlx::query(
            r"
            SELECT message_id FROM log_messages WHERE log_id = $1
            ",
        )
        .bind(log_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("message_id")).collect())
    }

    async fn message_count(&self, log_id: Uuid) -> AppResult<i64> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as count FROM log_messages WHERE log_id = $1
            ",
        )
        .bind(log_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("count"))
    }
}
