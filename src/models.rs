// ABOUTME: Core domain types for users, conversations and the two message-log shapes
// ABOUTME: Wire-format serde names follow the UI protocol (camelCase tool fields, kebab-case states)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

//! Domain models shared between route handlers and the database layer.
//!
//! The same logical message can exist in both logs under one `id` but with
//! different shapes: the UI log keeps rich `parts`, the agent log keeps an
//! opaque payload projected for model consumption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account, created on first login or by explicit creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Email address, unique across all users
    pub email: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; set rows are excluded from all reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Lifecycle status of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Archived,
}

impl ConversationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    /// Parse from a storage string
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "archived" => Self::Archived,
            _ => Self::Active,
        }
    }
}

/// A titled, model-tagged chat session owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// System-generated identifier
    pub id: Uuid,
    /// Client-supplied UUID, globally unique and immutable; doubles as an
    /// idempotency key for creation
    pub conversation_id: Uuid,
    /// Owning user, immutable
    pub user_id: Uuid,
    /// Conversation title
    pub title: String,
    /// LLM model tag for this conversation
    pub model_name: String,
    /// active or archived
    pub status: ConversationStatus,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// Last-activity watermark, touched on every append
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Which of the two parallel logs a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Rich UI-shaped messages with parts
    UserContext,
    /// Model-shaped messages with opaque content
    AgentContext,
}

impl LogKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserContext => "user_context",
            Self::AgentContext => "agent_context",
        }
    }
}

/// Role of a UI-log message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiRole {
    User,
    Assistant,
}

impl UiRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Role of an agent-log message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    System,
    User,
    Assistant,
    Tool,
}

impl AgentRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// Execution state of a tool invocation part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolInvocationState {
    #[serde(rename = "call")]
    Call,
    #[serde(rename = "result")]
    Result,
    #[serde(rename = "partial-call")]
    PartialCall,
}

/// A typed fragment of a UI message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UiPart {
    #[serde(rename = "text")]
    Text {
        /// Plain text fragment
        text: String,
    },
    #[serde(rename = "tool-invocation")]
    ToolInvocation {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        state: ToolInvocationState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
    },
}

/// UI-shaped message as submitted and stored in the `user_context` log.
///
/// `content` and `created_at` are optional on the wire; append normalization
/// fills them (empty string / current time) before anything is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiMessage {
    pub id: String,
    pub role: UiRole,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<UiPart>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Model-shaped message as stored in the `agent_context` log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: String,
    pub role: AgentRole,
    /// Opaque payload forwarded to the model; never interpreted here
    pub content: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
