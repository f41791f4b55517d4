// ABOUTME: Conversation endpoints: CRUD plus the append operations for both message logs
// ABOUTME: Every route resolves ownership first; foreign conversations read as 404
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

//! Conversation lifecycle and message persistence.
//!
//! A conversation carries two parallel logs keyed by [`LogKind`]: the
//! `user_context` log holds UI-shaped messages with rich parts, the
//! `agent_context` log holds model-shaped messages with opaque content.
//! Appends are idempotent per message id, so clients retry freely.

use crate::database::{AppendOutcome, NewLogEntry, StatusFilter, StoredMessage};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{
    AgentMessage, AgentRole, Conversation, ConversationStatus, LogKind, UiMessage, UiRole,
};
use crate::pagination::{PaginatedResponse, PaginationParams};
use crate::response::ApiResponse;
use crate::server::ServerResources;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const TITLE_MAX: usize = 200;

/// Conversation routes
pub struct ConversationRoutes;

impl ConversationRoutes {
    /// Build the conversation router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/conversations",
                get(list_conversations).post(create_conversation),
            )
            .route(
                "/api/conversations/:conversation_id",
                get(get_conversation)
                    .patch(update_conversation)
                    .delete(delete_conversation),
            )
            .route(
                "/api/conversations/:conversation_id/user-context/append",
                post(append_user_context),
            )
            .route(
                "/api/conversations/:conversation_id/agent-context/append",
                post(append_agent_context),
            )
            .route(
                "/api/conversations/:conversation_id/messages",
                post(add_message),
            )
            .with_state(resources)
    }
}

#[derive(Debug, Deserialize)]
struct CreateConversationRequest {
    conversation_id: String,
    title: String,
    #[serde(alias = "model")]
    model_name: String,
    #[serde(default)]
    initial_message: Option<InitialMessage>,
}

/// First user message, mirrored into both logs under one id and timestamp.
///
/// Accepts either a bare string or `{id?, content}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InitialMessage {
    Text(String),
    Message {
        #[serde(default)]
        id: Option<String>,
        content: String,
    },
}

impl InitialMessage {
    fn into_parts(self) -> (Option<String>, String) {
        match self {
            Self::Text(content) => (None, content),
            Self::Message { id, content } => (id, content),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpdateConversationRequest {
    title: Option<String>,
    #[serde(alias = "model")]
    model_name: Option<String>,
    status: Option<ConversationStatus>,
    /// Optional message appended to both logs as part of the update
    #[serde(default)]
    message: Option<AddMessageRequest>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusQuery {
    #[serde(default)]
    status: StatusFilter,
}

#[derive(Debug, Deserialize)]
struct AppendUiRequest {
    messages: Vec<UiMessage>,
}

#[derive(Debug, Deserialize)]
struct AppendAgentRequest {
    messages: Vec<AgentMessage>,
}

#[derive(Debug, Deserialize)]
struct AddMessageRequest {
    #[serde(default)]
    id: Option<String>,
    role: UiRole,
    content: String,
}

/// Full conversation view with both log contents in insertion order
#[derive(Debug, Serialize)]
struct ConversationDetail {
    #[serde(flatten)]
    conversation: Conversation,
    user_context: Vec<UiMessage>,
    agent_context: Vec<AgentMessage>,
}

/// POST /api/conversations
///
/// `conversation_id` is client-supplied and globally unique; resubmitting the
/// same id answers 409, which lets a client treat creation as idempotent.
async fn create_conversation(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<CreateConversationRequest>,
) -> AppResult<Response> {
    let user = resources.auth.authenticate_request(&headers).await?;

    let conversation_id = parse_conversation_id(&request.conversation_id)?;
    let title = validate_title(&request.title)?;
    let model_name = validate_model_name(&request.model_name)?;

    let conversation = resources
        .database
        .conversations()
        .create(user.id, conversation_id, title, model_name)
        .await?;

    let logs = resources.database.message_logs();
    logs.ensure_log(conversation.id, LogKind::UserContext).await?;
    logs.ensure_log(conversation.id, LogKind::AgentContext).await?;

    if let Some(initial) = request.initial_message {
        let now = Utc::now();
        let (id, content) = initial.into_parts();
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let ui_entry = NewLogEntry {
            message_id: id.clone(),
            role: UiRole::User.as_str().to_owned(),
            content: content.clone(),
            parts: None,
            created_at: now,
        };
        let agent_entry = NewLogEntry {
            message_id: id,
            role: AgentRole::User.as_str().to_owned(),
            content: encode_agent_content(&serde_json::Value::String(content))?,
            parts: None,
            created_at: now,
        };

        logs.append(conversation.id, LogKind::UserContext, &[ui_entry])
            .await?;
        logs.append(conversation.id, LogKind::AgentContext, &[agent_entry])
            .await?;
    }

    let detail = load_detail(&resources, conversation).await?;
    Ok(ApiResponse::created(
        detail,
        "Conversation created successfully",
    ))
}

/// GET /api/conversations
async fn list_conversations(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<StatusQuery>,
) -> AppResult<Response> {
    let user = resources.auth.authenticate_request(&headers).await?;

    let (limit, offset) = pagination.to_limit_offset()?;
    let (conversations, total) = resources
        .database
        .conversations()
        .list(user.id, filter.status, limit, offset)
        .await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        conversations,
        total,
        pagination,
    )))
}

/// GET /api/conversations/:conversation_id
async fn get_conversation(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> AppResult<Response> {
    let user = resources.auth.authenticate_request(&headers).await?;

    let conversation = resolve_owned(&resources, &conversation_id, user.id).await?;
    let detail = load_detail(&resources, conversation).await?;

    Ok(ApiResponse::ok(detail))
}

/// PATCH /api/conversations/:conversation_id
async fn update_conversation(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Json(request): Json<UpdateConversationRequest>,
) -> AppResult<Response> {
    let user = resources.auth.authenticate_request(&headers).await?;

    let conversation = resolve_owned(&resources, &conversation_id, user.id).await?;

    if request.title.is_none()
        && request.model_name.is_none()
        && request.status.is_none()
        && request.message.is_none()
    {
        return Err(AppError::validation(
            "At least one field must be provided",
            &[("body", "Provide title, model_name, status and/or message")],
        ));
    }

    let title = request.title.as_deref().map(validate_title).transpose()?;
    let model_name = request
        .model_name
        .as_deref()
        .map(validate_model_name)
        .transpose()?;

    let manager = resources.database.conversations();
    if title.is_some() || model_name.is_some() || request.status.is_some() {
        manager
            .update_fields(conversation.id, title, model_name, request.status)
            .await?;
    }

    if let Some(message) = request.message {
        write_dual_log_message(&resources, &conversation, message).await?;
    }

    let updated = manager
        .get_owned(conversation.conversation_id, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation"))?;

    Ok(ApiResponse::ok_with_message(
        updated,
        "Conversation updated successfully",
    ))
}

/// DELETE /api/conversations/:conversation_id
///
/// Soft delete: logs stay on disk but the conversation disappears from every
/// read path.
async fn delete_conversation(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> AppResult<Response> {
    let user = resources.auth.authenticate_request(&headers).await?;

    let conversation_id = parse_conversation_id(&conversation_id)?;
    let deleted = resources
        .database
        .conversations()
        .soft_delete(conversation_id, user.id)
        .await?;
    if !deleted {
        return Err(AppError::not_found("Conversation"));
    }

    Ok(ApiResponse::ok_with_message(
        serde_json::json!(null),
        "Conversation deleted successfully",
    ))
}

/// POST /api/conversations/:conversation_id/user-context/append
async fn append_user_context(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Json(request): Json<AppendUiRequest>,
) -> AppResult<Response> {
    let user = resources.auth.authenticate_request(&headers).await?;
    let conversation = resolve_owned(&resources, &conversation_id, user.id).await?;

    require_non_empty_batch(request.messages.len())?;

    let now = Utc::now();
    let entries = request
        .messages
        .iter()
        .map(|m| normalize_ui(m, now))
        .collect::<AppResult<Vec<_>>>()?;

    let outcome =
        append_and_touch(&resources, &conversation, LogKind::UserContext, &entries).await?;
    Ok(ApiResponse::ok(outcome))
}

/// POST /api/conversations/:conversation_id/agent-context/append
async fn append_agent_context(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Json(request): Json<AppendAgentRequest>,
) -> AppResult<Response> {
    let user = resources.auth.authenticate_request(&headers).await?;
    let conversation = resolve_owned(&resources, &conversation_id, user.id).await?;

    require_non_empty_batch(request.messages.len())?;

    let now = Utc::now();
    let entries = request
        .messages
        .iter()
        .map(|m| normalize_agent(m, now))
        .collect::<AppResult<Vec<_>>>()?;

    let outcome =
        append_and_touch(&resources, &conversation, LogKind::AgentContext, &entries).await?;
    Ok(ApiResponse::ok(outcome))
}

/// POST /api/conversations/:conversation_id/messages
///
/// Convenience endpoint writing one message into both logs under a shared id
/// and timestamp, so the two views stay correlated.
async fn add_message(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Json(request): Json<AddMessageRequest>,
) -> AppResult<Response> {
    let user = resources.auth.authenticate_request(&headers).await?;
    let conversation = resolve_owned(&resources, &conversation_id, user.id).await?;

    let (id, ui_outcome, agent_outcome) =
        write_dual_log_message(&resources, &conversation, request).await?;

    Ok(ApiResponse::created(
        serde_json::json!({
            "message_id": id,
            "user_context": ui_outcome,
            "agent_context": agent_outcome,
        }),
        "Message added successfully",
    ))
}

/// Write one message into both logs under a shared id and timestamp, then
/// refresh the conversation's activity watermark
async fn write_dual_log_message(
    resources: &Arc<ServerResources>,
    conversation: &Conversation,
    message: AddMessageRequest,
) -> AppResult<(String, AppendOutcome, AppendOutcome)> {
    let now = Utc::now();
    let id = message.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    if id.trim().is_empty() {
        return Err(AppError::validation(
            "Invalid message",
            &[("id", "Message id cannot be empty")],
        ));
    }

    let ui_entry = NewLogEntry {
        message_id: id.clone(),
        role: message.role.as_str().to_owned(),
        content: message.content.clone(),
        parts: match message.role {
            UiRole::Assistant => Some("[]".to_owned()),
            UiRole::User => None,
        },
        created_at: now,
    };
    let agent_entry = NewLogEntry {
        message_id: id.clone(),
        role: message.role.as_str().to_owned(),
        content: encode_agent_content(&serde_json::Value::String(message.content))?,
        parts: None,
        created_at: now,
    };

    let logs = resources.database.message_logs();
    let ui_outcome = logs
        .append(conversation.id, LogKind::UserContext, &[ui_entry])
        .await?;
    let agent_outcome = logs
        .append(conversation.id, LogKind::AgentContext, &[agent_entry])
        .await?;

    resources
        .database
        .conversations()
        .touch(conversation.id, now)
        .await?;

    Ok((id, ui_outcome, agent_outcome))
}

/// Append to one log, then refresh the conversation's activity watermark.
///
/// The watermark moves even when every message was a duplicate; a client
/// resyncing a conversation still counts as activity.
async fn append_and_touch(
    resources: &Arc<ServerResources>,
    conversation: &Conversation,
    kind: LogKind,
    entries: &[NewLogEntry],
) -> AppResult<AppendOutcome> {
    let outcome = resources
        .database
        .message_logs()
        .append(conversation.id, kind, entries)
        .await?;

    resources
        .database
        .conversations()
        .touch(conversation.id, Utc::now())
        .await?;

    debug!(
        conversation_id = %conversation.conversation_id,
        kind = kind.as_str(),
        appended = outcome.appended,
        skipped = outcome.skipped,
        "append completed"
    );

    Ok(outcome)
}

async fn resolve_owned(
    resources: &Arc<ServerResources>,
    raw_id: &str,
    user_id: Uuid,
) -> AppResult<Conversation> {
    let conversation_id = parse_conversation_id(raw_id)?;
    resources
        .database
        .conversations()
        .get_owned(conversation_id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation"))
}

async fn load_detail(
    resources: &Arc<ServerResources>,
    conversation: Conversation,
) -> AppResult<ConversationDetail> {
    let logs = resources.database.message_logs();

    let user_context = logs
        .get_log(conversation.id, LogKind::UserContext)
        .await?
        .map(|log| log.messages.iter().map(ui_from_stored).collect())
        .unwrap_or_default();

    let agent_context = logs
        .get_log(conversation.id, LogKind::AgentContext)
        .await?
        .map(|log| log.messages.iter().map(agent_from_stored).collect())
        .unwrap_or_default();

    Ok(ConversationDetail {
        conversation,
        user_context,
        agent_context,
    })
}

/// Normalize a UI message for storage: fill `created_at`, serialize parts,
/// default assistant parts to an empty array
fn normalize_ui(message: &UiMessage, now: DateTime<Utc>) -> AppResult<NewLogEntry> {
    if message.id.trim().is_empty() {
        return Err(AppError::validation(
            "Invalid message",
            &[("id", "Message id cannot be empty")],
        ));
    }

    let parts = match (&message.parts, message.role) {
        (Some(parts), _) => Some(
            serde_json::to_string(parts)
                .map_err(|e| AppError::internal(format!("failed to encode parts: {e}")))?,
        ),
        (None, UiRole::Assistant) => Some("[]".to_owned()),
        (None, UiRole::User) => None,
    };

    Ok(NewLogEntry {
        message_id: message.id.clone(),
        role: message.role.as_str().to_owned(),
        content: message.content.clone(),
        parts,
        created_at: message.created_at.unwrap_or(now),
    })
}

/// Normalize an agent message: the payload is stored verbatim as JSON text
fn normalize_agent(message: &AgentMessage, now: DateTime<Utc>) -> AppResult<NewLogEntry> {
    if message.id.trim().is_empty() {
        return Err(AppError::validation(
            "Invalid message",
            &[("id", "Message id cannot be empty")],
        ));
    }

    Ok(NewLogEntry {
        message_id: message.id.clone(),
        role: message.role.as_str().to_owned(),
        content: encode_agent_content(&message.content)?,
        parts: None,
        created_at: message.created_at.unwrap_or(now),
    })
}

fn require_non_empty_batch(len: usize) -> AppResult<()> {
    if len == 0 {
        return Err(AppError::validation(
            "Invalid batch",
            &[("messages", "At least one message is required")],
        ));
    }
    Ok(())
}

fn encode_agent_content(content: &serde_json::Value) -> AppResult<String> {
    serde_json::to_string(content)
        .map_err(|e| AppError::internal(format!("failed to encode message content: {e}")))
}

fn ui_from_stored(message: &StoredMessage) -> UiMessage {
    UiMessage {
        id: message.message_id.clone(),
        role: match message.role.as_str() {
            "assistant" => UiRole::Assistant,
            _ => UiRole::User,
        },
        content: message.content.clone(),
        parts: message
            .parts
            .as_deref()
            .and_then(|p| serde_json::from_str(p).ok()),
        created_at: Some(message.created_at),
    }
}

fn agent_from_stored(message: &StoredMessage) -> AgentMessage {
    AgentMessage {
        id: message.message_id.clone(),
        role: match message.role.as_str() {
            "system" => AgentRole::System,
            "assistant" => AgentRole::Assistant,
            "tool" => AgentRole::Tool,
            _ => AgentRole::User,
        },
        content: serde_json::from_str(&message.content)
            .unwrap_or_else(|_| serde_json::Value::String(message.content.clone())),
        created_at: Some(message.created_at),
    }
}

fn parse_conversation_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        AppError::new(ErrorCode::InvalidId, "Conversation ID must be a valid UUID")
    })
}

fn validate_title(title: &str) -> AppResult<&str> {
    let trimmed = title.trim();
    if trimmed.is_empty() || trimmed.len() > TITLE_MAX {
        return Err(AppError::validation(
            "Invalid title",
            &[("title", "Title must be between 1 and 200 characters")],
        ));
    }
    Ok(trimmed)
}

fn validate_model_name(model_name: &str) -> AppResult<&str> {
    let trimmed = model_name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(
            "Invalid model name",
            &[("model_name", "Model name cannot be empty")],
        ));
    }
    Ok(trimmed)
}
