// ABOUTME: Conversation store operations with ownership scoping and soft delete
// ABOUTME: conversation_id is globally unique so a client UUID doubles as an idempotency key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

use super::map_unique_violation;
use crate::errors::AppResult;
use crate::models::{Conversation, ConversationStatus};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Status filter for conversation listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Active,
    Archived,
    #[default]
    All,
}

impl StatusFilter {
    /// The status string to match, or `None` for no filtering
    #[must_use]
    pub const fn as_match(self) -> Option<&'static str> {
        match self {
            Self::Active => Some("active"),
            Self::Archived => Some("archived"),
            Self::All => None,
        }
    }
}

/// Conversation store operations manager
pub struct ConversationManager {
    pool: SqlitePool,
}

fn map_conversation(row: &SqliteRow) -> Conversation {
    Conversation {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        model_name: row.get("model_name"),
        status: ConversationStatus::from_str_or_default(row.get("status")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

impl ConversationManager {
    /// Create a new conversation manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a conversation
    ///
    /// Relies on the unique index rather than a pre-check so two racing
    /// creates with the same `conversation_id` cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when `conversation_id` already exists (for any
    /// user), or a database error for other failures.
    pub async fn create(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        title: &str,
        model_name: &str,
    ) -> AppResult<Conversation> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO conversations (id, conversation_id, user_id, title, model_name, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'active', $6, $6)
            ",
        )
        .bind(id)
        .bind(conversation_id)
        .bind(user_id)
        .bind(title)
        .bind(model_name)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Conversation ID already exists"))?;

        Ok(Conversation {
            id,
            conversation_id,
            user_id,
            title: title.to_owned(),
            model_name: model_name.to_owned(),
            status: ConversationStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Ownership-scoped lookup by client conversation id.
    ///
    /// Missing, foreign-owned and soft-deleted conversations are all `None`
    /// so callers cannot distinguish them.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_owned(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Conversation>> {
        let row = sqlx::query(
            r"
            SELECT id, conversation_id, user_id, title, model_name, status, created_at, updated_at, deleted_at
            FROM conversations
            WHERE conversation_id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_conversation))
    }

    /// List a user's conversations, most recently active first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list(
        &self,
        user_id: Uuid,
        status: StatusFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Conversation>, i64)> {
        // $2 doubles as the "no filter" sentinel so one query covers both cases
        let status_match = status.as_match();

        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, user_id, title, model_name, status, created_at, updated_at, deleted_at
            FROM conversations
            WHERE user_id = $1 AND deleted_at IS NULL
              AND ($2 IS NULL OR status = $2)
            ORDER BY updated_at DESC
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(user_id)
        .bind(status_match)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(
            r"
            SELECT COUNT(*) as count
            FROM conversations
            WHERE user_id = $1 AND deleted_at IS NULL
              AND ($2 IS NULL OR status = $2)
            ",
        )
        .bind(user_id)
        .bind(status_match)
        .fetch_one(&self.pool)
        .await?
        .get("count");

        Ok((rows.iter().map(map_conversation).collect(), total))
    }

    /// Partial update of title/model/status; absent fields are left untouched
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn update_fields(
        &self,
        id: Uuid,
        title: Option<&str>,
        model_name: Option<&str>,
        status: Option<ConversationStatus>,
    ) -> AppResult<()> {
        let now = Utc::now();

        sqlx::query(
            r"
            UPDATE conversations
            SET title = COALESCE($1, title),
                model_name = COALESCE($2, model_name),
                status = COALESCE($3, status),
                updated_at = $4
            WHERE id = $5 AND deleted_at IS NULL
            ",
        )
        .bind(title)
        .bind(model_name)
        .bind(status.map(ConversationStatus::as_str))
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Refresh the last-activity watermark
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn touch(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE conversations SET updated_at = $1 WHERE id = $2
            ",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Soft-delete an owned conversation; message logs are left untouched
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn soft_delete(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r"
            UPDATE conversations
            SET deleted_at = $1, updated_at = $1
            WHERE conversation_id = $2 AND user_id = $3 AND deleted_at IS NULL
            ",
        )
        .bind(now)
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
