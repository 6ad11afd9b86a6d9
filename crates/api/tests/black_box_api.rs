use std::collections::HashMap;

use chrono::{Duration as ChronoDuration, Utc};
use configserver_auth::{JwtClaims, Role};
use configserver_core::UserId;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory storage, ephemeral port.
        let vars = HashMap::from([
            ("CONFIGSERVER_AUTH__JWT_SECRET".to_string(), JWT_SECRET.to_string()),
            ("CONFIGSERVER_AUTH__BCRYPT_COST".to_string(), "4".to_string()),
        ]);
        let settings = configserver_infra::Settings::from_env(
            config::Environment::with_prefix("CONFIGSERVER").source(Some(vars)),
        )
        .expect("settings");
        let app = configserver_api::app::build_app(&settings)
            .await
            .expect("failed to build app");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, client: &reqwest::Client, username: &str, password: &str) -> String {
        let res = client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, role: Role, issued_at: chrono::DateTime<Utc>) -> String {
    let claims = JwtClaims::new("minted", UserId::new(), role, issued_at, ChronoDuration::minutes(10));
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn create_group(
    client: &reqwest::Client,
    srv: &TestServer,
    token: &str,
    name: &str,
) -> String {
    let res = client
        .post(srv.url("/api/groups"))
        .bearer_auth(token)
        .json(&json!({ "name": name, "description": "d" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_environments_are_public() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "UP");

    let res = client.get(srv.url("/api/environments")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 4);
    assert!(body.as_array().unwrap().iter().any(|e| e == "PROD"));
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn foreign_and_expired_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let foreign = mint_jwt("other-secret", Role::Admin, Utc::now());
    let res = client
        .get(srv.url("/api/groups"))
        .bearer_auth(foreign)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = mint_jwt(JWT_SECRET, Role::Admin, Utc::now() - ChronoDuration::hours(1));
    let res = client
        .get(srv.url("/api/groups"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_yields_a_token_that_identifies_the_user() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/auth/login"))
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = srv.login(&client, "admin", "admin123").await;
    let res = client
        .get(srv.url("/api/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "admin");
    assert_eq!(body["role"], "ADMIN");
}

#[tokio::test]
async fn read_only_users_cannot_write() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client, "user", "user123").await;

    let res = client
        .get(srv.url("/api/groups"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/api/groups"))
        .bearer_auth(&token)
        .json(&json!({ "name": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(srv.url("/api/audit"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(srv.url("/api/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn editors_manage_configuration_but_not_users() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(JWT_SECRET, Role::Editor, Utc::now());

    create_group(&client, &srv, &token, "editor-group").await;

    let res = client
        .get(srv.url("/api/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn group_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client, "admin", "admin123").await;

    let id = create_group(&client, &srv, &token, "api-service").await;

    // Duplicate name
    let res = client
        .post(srv.url("/api/groups"))
        .bearer_auth(&token)
        .json(&json!({ "name": "api-service" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Blank name
    let res = client
        .post(srv.url("/api/groups"))
        .bearer_auth(&token)
        .json(&json!({ "name": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/api/groups/name/api-service"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["id"], id.as_str());

    let res = client
        .put(srv.url(&format!("/api/groups/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "name": "api-service", "description": "updated" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["description"], "updated");

    let res = client
        .delete(srv.url(&format!("/api/groups/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/api/groups/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/api/groups/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn item_lifecycle_with_scope_uniqueness_and_cascade() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client, "admin", "admin123").await;
    let group = create_group(&client, &srv, &token, "payments").await;

    let item = json!({
        "key": "db.url",
        "value": "jdbc:dev",
        "environment": "DEV",
        "groupId": group,
    });
    let res = client
        .post(srv.url("/api/items"))
        .bearer_auth(&token)
        .json(&item)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    let item_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["environment"], "DEV");
    assert_eq!(created["groupId"], group.as_str());

    // Same scope again
    let res = client
        .post(srv.url("/api/items"))
        .bearer_auth(&token)
        .json(&item)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Same key, other environment is fine
    let res = client
        .post(srv.url("/api/items"))
        .bearer_auth(&token)
        .json(&json!({
            "key": "db.url",
            "value": "jdbc:prod",
            "environment": "PROD",
            "groupId": group,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // Unknown environment
    let res = client
        .post(srv.url("/api/items"))
        .bearer_auth(&token)
        .json(&json!({
            "key": "k",
            "value": "v",
            "environment": "QA",
            "groupId": group,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url(&format!("/api/items/group/{group}/environment/PROD")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["value"], "jdbc:prod");

    let res = client
        .put(srv.url(&format!("/api/items/{item_id}")))
        .bearer_auth(&token)
        .json(&json!({
            "key": "db.url",
            "value": "jdbc:dev2",
            "environment": "DEV",
            "groupId": group,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["value"], "jdbc:dev2");

    // Deleting the group takes its items with it
    let res = client
        .delete(srv.url(&format!("/api/groups/{group}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/api/items/{item_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/api/items"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn mutations_are_audited_with_the_acting_user() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client, "admin", "admin123").await;
    let group = create_group(&client, &srv, &token, "audited").await;

    let res = client
        .put(srv.url(&format!("/api/groups/{group}")))
        .bearer_auth(&token)
        .json(&json!({ "name": "audited-2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/api/audit/Group/{group}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "CREATE");
    assert_eq!(entries[1]["action"], "UPDATE");
    assert!(entries.iter().all(|e| e["userId"] == "admin"));
    assert!(entries[0]["oldValue"].is_null());

    let res = client
        .get(srv.url("/api/audit?limit=1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["action"], "UPDATE");

    let res = client
        .get(srv.url(&format!("/api/audit/Widget/{group}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_management_is_admin_only_and_hides_hashes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client, "admin", "admin123").await;

    let res = client
        .post(srv.url("/api/users"))
        .bearer_auth(&token)
        .json(&json!({ "username": "carol", "email": "carol@example.com", "role": "EDITOR" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["role"], "EDITOR");
    assert!(created.get("passwordHash").is_none());
    let id = created["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url("/api/users"))
        .bearer_auth(&token)
        .json(&json!({ "username": "carol", "email": "other@example.com", "role": "EDITOR" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .put(srv.url(&format!("/api/users/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "email": "carol@example.com", "role": "READ_ONLY", "enabled": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["enabled"], false);

    let res = client
        .delete(srv.url(&format!("/api/users/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url("/api/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn password_reset_endpoints_do_not_leak_accounts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let known = client
        .post(srv.url("/api/users/forgot-password"))
        .json(&json!({ "email": "admin@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(known.status(), StatusCode::OK);
    let known: Value = known.json().await.unwrap();

    let unknown = client
        .post(srv.url("/api/users/forgot-password"))
        .json(&json!({ "email": "nobody@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::OK);
    let unknown: Value = unknown.json().await.unwrap();
    assert_eq!(known, unknown);

    let res = client
        .post(srv.url("/api/users/forgot-password"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/api/users/validate-token?token=bogus"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["valid"], false);

    let res = client
        .post(srv.url("/api/users/reset-password?token=bogus"))
        .json(&json!({ "password": "new-pass-1", "confirmPassword": "new-pass-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn incomplete_bodies_are_validation_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client, "admin", "admin123").await;
    let group = create_group(&client, &srv, &token, "bodies").await;

    // No key
    let res = client
        .post(srv.url("/api/items"))
        .bearer_auth(&token)
        .json(&json!({ "value": "v", "environment": "DEV", "groupId": group }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    // No name
    let res = client
        .put(srv.url(&format!("/api/groups/{group}")))
        .bearer_auth(&token)
        .json(&json!({ "description": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Not JSON at all
    let res = client
        .post(srv.url("/api/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}
