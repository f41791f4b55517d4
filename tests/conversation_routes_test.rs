// ABOUTME: Integration tests for conversation lifecycle endpoints
// ABOUTME: Covers creation, ownership scoping, listing, partial update and soft delete
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use common::{bearer, create_test_server_resources, create_test_user, test_router};
use helpers::axum_test::AxumTestRequest;
use parley_chat_server::server::ServerResources;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

const OWNER: &str = "owner@example.com";

async fn setup() -> (Arc<ServerResources>, String) {
    let resources = create_test_server_resources().await.unwrap();
    create_test_user(&resources, OWNER).await.unwrap();
    (resources, bearer(OWNER))
}

async fn create_conversation(
    resources: &Arc<ServerResources>,
    auth: &str,
    conversation_id: Uuid,
    title: &str,
) -> Value {
    let response = AxumTestRequest::post("/api/conversations")
        .header("authorization", auth)
        .json(&json!({
            "conversation_id": conversation_id,
            "title": title,
            "model_name": "gpt-4o",
        }))
        .send(test_router(resources))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn test_create_conversation() {
    let (resources, auth) = setup().await;
    let conversation_id = Uuid::new_v4();

    let body = create_conversation(&resources, &auth, conversation_id, "Trip planning").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["conversation_id"], json!(conversation_id));
    assert_eq!(body["data"]["title"], "Trip planning");
    assert_eq!(body["data"]["status"], "active");
    // Both logs exist and start empty
    assert_eq!(body["data"]["user_context"], json!([]));
    assert_eq!(body["data"]["agent_context"], json!([]));
}

#[tokio::test]
async fn test_create_with_initial_message_seeds_both_logs() {
    let (resources, auth) = setup().await;
    let conversation_id = Uuid::new_v4();

    let response = AxumTestRequest::post("/api/conversations")
        .header("authorization", &auth)
        .json(&json!({
            "conversation_id": conversation_id,
            "title": "Trip planning",
            "model_name": "gpt-4o",
            "initial_message": {"id": "m-init", "content": "Where should I go?"},
        }))
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();

    let ui = body["data"]["user_context"].as_array().unwrap();
    let agent = body["data"]["agent_context"].as_array().unwrap();
    assert_eq!(ui.len(), 1);
    assert_eq!(agent.len(), 1);

    // Same id in both logs, role user, kind-specific shapes
    assert_eq!(ui[0]["id"], "m-init");
    assert_eq!(agent[0]["id"], "m-init");
    assert_eq!(ui[0]["role"], "user");
    assert_eq!(agent[0]["role"], "user");
    assert_eq!(ui[0]["content"], "Where should I go?");
    assert_eq!(agent[0]["content"], "Where should I go?");
}

#[tokio::test]
async fn test_create_accepts_model_alias_and_string_initial_message() {
    let (resources, auth) = setup().await;
    let conversation_id = Uuid::new_v4();

    // Shorthand client shape: "model" field and a bare-string first message
    let response = AxumTestRequest::post("/api/conversations")
        .header("authorization", &auth)
        .json(&json!({
            "conversation_id": conversation_id,
            "title": "Chat",
            "model": "gpt-x",
            "initial_message": "hi",
        }))
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["data"]["model_name"], "gpt-x");

    let ui = body["data"]["user_context"].as_array().unwrap();
    let agent = body["data"]["agent_context"].as_array().unwrap();
    assert_eq!(ui.len(), 1);
    assert_eq!(agent.len(), 1);
    assert_eq!(ui[0]["role"], "user");
    assert_eq!(ui[0]["content"], "hi");
    assert_eq!(agent[0]["content"], "hi");
}

#[tokio::test]
async fn test_duplicate_conversation_id_is_409_even_across_users() {
    let (resources, auth) = setup().await;
    create_test_user(&resources, "other@example.com").await.unwrap();
    let conversation_id = Uuid::new_v4();

    create_conversation(&resources, &auth, conversation_id, "First").await;

    let response = AxumTestRequest::post("/api/conversations")
        .header("authorization", &bearer("other@example.com"))
        .json(&json!({
            "conversation_id": conversation_id,
            "title": "Second",
            "model_name": "gpt-4o",
        }))
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_create_conversation_validation() {
    let (resources, auth) = setup().await;
    let router = test_router(&resources);

    for (payload, expected) in [
        (
            json!({"conversation_id": "not-a-uuid", "title": "T", "model_name": "m"}),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({"conversation_id": Uuid::new_v4(), "title": "  ", "model_name": "m"}),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            json!({"conversation_id": Uuid::new_v4(), "title": "x".repeat(201), "model_name": "m"}),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            json!({"conversation_id": Uuid::new_v4(), "title": "T", "model_name": ""}),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
    ] {
        let response = AxumTestRequest::post("/api/conversations")
            .header("authorization", &auth)
            .json(&payload)
            .send(router.clone())
            .await;
        assert_eq!(response.status_code(), expected, "{payload}");
    }
}

#[tokio::test]
async fn test_get_conversation_scoped_to_owner() {
    let (resources, auth) = setup().await;
    create_test_user(&resources, "other@example.com").await.unwrap();
    let conversation_id = Uuid::new_v4();
    create_conversation(&resources, &auth, conversation_id, "Mine").await;

    let owner_view = AxumTestRequest::get(&format!("/api/conversations/{conversation_id}"))
        .header("authorization", &auth)
        .send(test_router(&resources))
        .await;
    assert_eq!(owner_view.status_code(), StatusCode::OK);

    // A foreign conversation reads exactly like a missing one
    let foreign_view = AxumTestRequest::get(&format!("/api/conversations/{conversation_id}"))
        .header("authorization", &bearer("other@example.com"))
        .send(test_router(&resources))
        .await;
    assert_eq!(foreign_view.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_conversations_with_status_filter() {
    let (resources, auth) = setup().await;
    let router = test_router(&resources);

    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    create_conversation(&resources, &auth, first, "Stays active").await;
    create_conversation(&resources, &auth, second, "Gets archived").await;

    let archived = AxumTestRequest::patch(&format!("/api/conversations/{second}"))
        .header("authorization", &auth)
        .json(&json!({"status": "archived"}))
        .send(router.clone())
        .await;
    assert_eq!(archived.status_code(), StatusCode::OK);

    let all: Value = AxumTestRequest::get("/api/conversations")
        .header("authorization", &auth)
        .send(router.clone())
        .await
        .json();
    assert_eq!(all["data"]["total"], 2);

    let only_archived: Value = AxumTestRequest::get("/api/conversations?status=archived")
        .header("authorization", &auth)
        .send(router.clone())
        .await
        .json();
    assert_eq!(only_archived["data"]["total"], 1);
    assert_eq!(
        only_archived["data"]["items"][0]["conversation_id"],
        json!(second)
    );

    let only_active: Value = AxumTestRequest::get("/api/conversations?status=active")
        .header("authorization", &auth)
        .send(router)
        .await
        .json();
    assert_eq!(only_active["data"]["total"], 1);
    assert_eq!(
        only_active["data"]["items"][0]["conversation_id"],
        json!(first)
    );
}

#[tokio::test]
async fn test_list_excludes_other_users() {
    let (resources, auth) = setup().await;
    create_test_user(&resources, "other@example.com").await.unwrap();
    create_conversation(&resources, &auth, Uuid::new_v4(), "Mine").await;

    let body: Value = AxumTestRequest::get("/api/conversations")
        .header("authorization", &bearer("other@example.com"))
        .send(test_router(&resources))
        .await
        .json();

    assert_eq!(body["data"]["total"], 0);
    assert_eq!(body["data"]["items"], json!([]));
}

#[tokio::test]
async fn test_update_conversation_fields() {
    let (resources, auth) = setup().await;
    let conversation_id = Uuid::new_v4();
    create_conversation(&resources, &auth, conversation_id, "Old title").await;

    let response = AxumTestRequest::patch(&format!("/api/conversations/{conversation_id}"))
        .header("authorization", &auth)
        .json(&json!({"title": "New title", "model_name": "gpt-4o-mini"}))
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["data"]["title"], "New title");
    assert_eq!(body["data"]["model_name"], "gpt-4o-mini");
    assert_eq!(body["data"]["status"], "active");
}

#[tokio::test]
async fn test_update_with_message_appends_to_both_logs() {
    let (resources, auth) = setup().await;
    let conversation_id = Uuid::new_v4();
    create_conversation(&resources, &auth, conversation_id, "Title").await;
    let router = test_router(&resources);

    let response = AxumTestRequest::patch(&format!("/api/conversations/{conversation_id}"))
        .header("authorization", &auth)
        .json(&json!({"message": {"role": "user", "content": "appended via update"}}))
        .send(router.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let detail: Value = AxumTestRequest::get(&format!("/api/conversations/{conversation_id}"))
        .header("authorization", &auth)
        .send(router)
        .await
        .json();
    let ui = detail["data"]["user_context"].as_array().unwrap();
    let agent = detail["data"]["agent_context"].as_array().unwrap();
    assert_eq!(ui.len(), 1);
    assert_eq!(agent.len(), 1);
    assert_eq!(ui[0]["content"], "appended via update");
    assert_eq!(ui[0]["id"], agent[0]["id"]);
}

#[tokio::test]
async fn test_update_requires_a_field() {
    let (resources, auth) = setup().await;
    let conversation_id = Uuid::new_v4();
    create_conversation(&resources, &auth, conversation_id, "Title").await;

    let response = AxumTestRequest::patch(&format!("/api/conversations/{conversation_id}"))
        .header("authorization", &auth)
        .json(&json!({}))
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_delete_conversation_soft() {
    let (resources, auth) = setup().await;
    let conversation_id = Uuid::new_v4();
    create_conversation(&resources, &auth, conversation_id, "Doomed").await;
    let router = test_router(&resources);

    let deleted = AxumTestRequest::delete(&format!("/api/conversations/{conversation_id}"))
        .header("authorization", &auth)
        .send(router.clone())
        .await;
    assert_eq!(deleted.status_code(), StatusCode::OK);

    let get = AxumTestRequest::get(&format!("/api/conversations/{conversation_id}"))
        .header("authorization", &auth)
        .send(router.clone())
        .await;
    assert_eq!(get.status_code(), StatusCode::NOT_FOUND);

    let list: Value = AxumTestRequest::get("/api/conversations")
        .header("authorization", &auth)
        .send(router.clone())
        .await
        .json();
    assert_eq!(list["data"]["total"], 0);

    let again = AxumTestRequest::delete(&format!("/api/conversations/{conversation_id}"))
        .header("authorization", &auth)
        .send(router)
        .await;
    assert_eq!(again.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_conversation_routes_require_auth() {
    let (resources, _auth) = setup().await;

    let response = AxumTestRequest::get("/api/conversations")
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let (resources, _auth) = setup().await;

    let response = AxumTestRequest::get("/api/health")
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["environment"], "testing");
    assert!(body["data"]["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let (resources, _auth) = setup().await;

    let response = AxumTestRequest::get("/api/nope")
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
