// ABOUTME: Integration tests for API endpoints
// ABOUTME: Tests complete request/response flows, authentication, and error handling

#[cfg(test)]
mod tests {
    use super::super::*;
    use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
    use axum_test::TestServer;
    use serde_json::json;
    use serial_test::serial;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_app() -> (TestServer, AuthState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let storage = Arc::new(
            Storage::new(&format!("sqlite:{}?mode=rwc", db_path.display()))
                .await
                .unwrap(),
        );
        let auth = AuthState::new("integration-test-secret");

        let state = AppState {
            auth: auth.clone(),
            storage,
        };

        (TestServer::new(app(state)).unwrap(), auth, temp_dir)
    }

    fn bearer(auth: &AuthState, user: &str) -> HeaderValue {
        let token = auth.issue(user, 3600).unwrap();
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
    }

    fn heading_body(workspace: &str, text: &str) -> serde_json::Value {
        json!({
            "type": "heading",
            "properties": { "text": text, "level": 1 },
            "workspace": workspace
        })
    }

    #[tokio::test]
    #[serial]
    async fn test_requests_without_token_are_rejected() {
        let (server, _auth, _temp_dir) = create_test_app().await;

        let response = server.post("/blocks").json(&heading_body("ws1", "x")).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_token_is_rejected() {
        let (server, _auth, _temp_dir) = create_test_app().await;

        let response = server
            .post("/blocks")
            .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer garbage"))
            .json(&heading_body("ws1", "x"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn test_expired_token_is_rejected() {
        let (server, auth, _temp_dir) = create_test_app().await;

        let token = auth.issue("alice", -10).unwrap();
        let response = server
            .post("/blocks")
            .add_header(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
            )
            .json(&heading_body("ws1", "x"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn test_create_and_fetch_block() {
        let (server, auth, _temp_dir) = create_test_app().await;

        let response = server
            .post("/blocks")
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .json(&heading_body("ws1", "Hello"))
            .await;
        response.assert_status_ok();

        let created: ContentBlock = response.json();
        assert_eq!(created.metadata.version, 1);
        assert_eq!(created.metadata.created_by, "alice");
        assert_eq!(created.metadata.environment, Environment::Draft);

        let fetched = server
            .get(&format!("/blocks/{}", created.id))
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .await;
        fetched.assert_status_ok();
        let block: ContentBlock = fetched.json();
        assert_eq!(block.id, created.id);
    }

    #[tokio::test]
    #[serial]
    async fn test_update_and_version_history() {
        let (server, auth, _temp_dir) = create_test_app().await;

        let created: ContentBlock = server
            .post("/blocks")
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .json(&heading_body("ws1", "Hello"))
            .await
            .json();

        let response = server
            .put(&format!("/blocks/{}", created.id))
            .add_header(AUTHORIZATION, bearer(&auth, "bob"))
            .json(&json!({
                "properties": { "text": "Hello World", "level": 1 },
                "comment": "typo fix"
            }))
            .await;
        response.assert_status_ok();

        let updated: ContentBlock = response.json();
        assert_eq!(updated.metadata.version, 2);
        assert_eq!(updated.metadata.updated_by, "bob");

        let history = server
            .get(&format!("/blocks/{}/versions", created.id))
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .await;
        history.assert_status_ok();
        let versions: Vec<BlockVersion> = history.json();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, 2);
        assert_eq!(versions[0].metadata.comment.as_deref(), Some("typo fix"));
    }

    #[tokio::test]
    #[serial]
    async fn test_query_blocks_is_workspace_scoped_and_paginated() {
        let (server, auth, _temp_dir) = create_test_app().await;

        for i in 1..=3 {
            server
                .post("/blocks")
                .add_header(AUTHORIZATION, bearer(&auth, "alice"))
                .json(&heading_body("ws1", &format!("block {i}")))
                .await
                .assert_status_ok();
        }
        server
            .post("/blocks")
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .json(&heading_body("ws2", "elsewhere"))
            .await
            .assert_status_ok();

        let response = server
            .post("/blocks/query")
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .json(&json!({ "workspace": "ws1", "page": 1, "limit": 2 }))
            .await;
        response.assert_status_ok();

        let result: BlockListResult = response.json();
        assert_eq!(result.total, 3);
        assert_eq!(result.items.len(), 2);
        assert!(result.has_more);
        assert!(
            result
                .items
                .iter()
                .all(|item| item.metadata.workspace == "ws1")
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_reference_route_records_source_version() {
        let (server, auth, _temp_dir) = create_test_app().await;

        let created: ContentBlock = server
            .post("/blocks")
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .json(&heading_body("ws1", "source"))
            .await
            .json();

        let response = server
            .post(&format!("/blocks/{}/references", created.id))
            .add_header(AUTHORIZATION, bearer(&auth, "bob"))
            .json(&json!({ "type": "reference" }))
            .await;
        response.assert_status_ok();

        let reference: BlockReference = response.json();
        assert_eq!(reference.source_id, created.id);
        assert_eq!(reference.source_version, 1);
        assert_eq!(reference.metadata.created_by, "bob");
    }

    #[tokio::test]
    #[serial]
    async fn test_tree_route_returns_nested_children() {
        let (server, auth, _temp_dir) = create_test_app().await;

        let root: ContentBlock = server
            .post("/blocks")
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .json(&json!({
                "type": "section",
                "properties": { "order": 0 },
                "workspace": "ws1"
            }))
            .await
            .json();

        let child_body = json!({
            "type": "heading",
            "properties": { "text": "Intro", "level": 2 },
            "workspace": "ws1",
            "parent_id": root.id
        });
        server
            .post("/blocks")
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .json(&child_body)
            .await
            .assert_status_ok();

        let response = server
            .get(&format!("/blocks/{}/tree", root.id))
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .await;
        response.assert_status_ok();

        let tree: ContentBlock = response.json();
        assert_eq!(tree.id, root.id);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(
            tree.children[0].parent,
            Some(ParentRef {
                id: root.id,
                block_type: BlockKind::Section,
            })
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_delete_route_removes_block() {
        let (server, auth, _temp_dir) = create_test_app().await;

        let created: ContentBlock = server
            .post("/blocks")
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .json(&heading_body("ws1", "doomed"))
            .await
            .json();

        let response = server
            .delete(&format!("/blocks/{}", created.id))
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>()["success"], true);

        let missing = server
            .get(&format!("/blocks/{}", created.id))
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .await;
        missing.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn test_unknown_block_returns_404() {
        let (server, auth, _temp_dir) = create_test_app().await;

        let response = server
            .get(&format!("/blocks/{}", uuid::Uuid::new_v4()))
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_properties_are_rejected() {
        let (server, auth, _temp_dir) = create_test_app().await;

        // Structurally valid heading with an out-of-range level
        let response = server
            .post("/blocks")
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .json(&json!({
                "type": "heading",
                "properties": { "text": "too deep", "level": 9 },
                "workspace": "ws1"
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        // Properties that do not match the declared type fail at the JSON boundary
        let response = server
            .post("/blocks")
            .add_header(AUTHORIZATION, bearer(&auth, "alice"))
            .json(&json!({
                "type": "heading",
                "properties": { "src": "/a.png", "alt": "a" },
                "workspace": "ws1"
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
