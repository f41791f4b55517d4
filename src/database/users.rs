// ABOUTME: User directory database operations with soft delete and unique-email enforcement
// ABOUTME: Auto-provisioning on login goes through create_user; races resolve via the unique index
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

use super::map_unique_violation;
use crate::errors::AppResult;
use crate::models::User;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// User directory operations manager
pub struct UserManager {
    pool: SqlitePool,
}

fn map_user(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

impl UserManager {
    /// Create a new user manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user; the unique email index resolves concurrent duplicates
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when the email is already registered, or a database
    /// error for other failures.
    pub async fn create_user(&self, name: &str, email: &str) -> AppResult<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO users (id, name, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "A user with this email already exists"))?;

        Ok(User {
            id,
            name: name.to_owned(),
            email: email.to_owned(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Get a user by id, excluding soft-deleted rows
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_user))
    }

    /// Get a user by email, excluding soft-deleted rows
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, created_at, updated_at, deleted_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_user))
    }

    /// List users with pagination, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list_users(&self, limit: i64, offset: i64) -> AppResult<(Vec<User>, i64)> {
        let rows = sqlx::query(
            r"
            SELECT id, name, email, created_at, updated_at, deleted_at
            FROM users
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(
            r"
            SELECT COUNT(*) as count FROM users WHERE deleted_at IS NULL
            ",
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        Ok((rows.iter().map(map_user).collect(), total))
    }

    /// Partial update of name and/or email
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when the new email collides with another user, or a
    /// database error for other failures.
    pub async fn update_user(
        &self,
        user_id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Option<User>> {
        let now = Utc::now();

        let result = sqlx::query(
            r"
            UPDATE users
            SET name = COALESCE($1, name),
                email = COALESCE($2, email),
                updated_at = $3
            WHERE id = $4 AND deleted_at IS NULL
            ",
        )
        .bind(name)
        .bind(email)
        .bind(now)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "A user with this email already exists"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_user(user_id).await
    }

    /// Soft-delete a user; returns false when the user was absent or already deleted
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn soft_delete_user(&self, user_id: Uuid) -> AppResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r"
            UPDATE users
            SET deleted_at = $1, updated_at = $1
            WHERE id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
