use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use haocai_api::app::{AppState, build_app};
use haocai_auth::{
    Hs256TokenService, InMemoryIdentityLoader, JwtClaims, Role, RoleCatalog, UserRecord, UserStatus,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";
const ISSUER: &str = "haocai";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let identities = InMemoryIdentityLoader::new(RoleCatalog::materials_defaults())
            .with_user(
                UserRecord::new("admin")
                    .with_roles(["admin"])
                    .with_password("admin-pw")
                    .unwrap(),
            )
            .with_user(UserRecord::new("keeper").with_roles(["warehouse"]))
            .with_user(UserRecord::new("buyer").with_roles(["purchaser"]))
            .with_user(UserRecord::new("viewer").with_roles(["viewer"]))
            .with_user(
                UserRecord::new("gone")
                    .with_roles(["admin"])
                    .with_status(UserStatus::Disabled)
                    .with_password("gone-pw")
                    .unwrap(),
            );
        let tokens = Arc::new(Hs256TokenService::new(
            JWT_SECRET.as_bytes(),
            ChronoDuration::hours(1),
            ISSUER,
        ));
        let identities = Arc::new(identities);
        let state = AppState::new(tokens.clone(), identities.clone()).with_login(tokens, identities);
        let app = build_app(state).unwrap();

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
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: &str, issued: chrono::DateTime<Utc>, ttl: ChronoDuration) -> String {
    let claims = JwtClaims {
        sub: sub.to_string(),
        roles: vec![Role::new("ignored-by-server")],
        iat: issued.timestamp(),
        exp: (issued + ttl).timestamp(),
        iss: ISSUER.to_string(),
        jti: "test".to_string(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn token(sub: &str) -> String {
    mint_jwt(sub, Utc::now(), ChronoDuration::minutes(10))
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 200);
    assert_eq!(body["data"]["status"], "UP");
}

#[tokio::test]
async fn expired_token_still_reaches_public_routes() {
    let srv = TestServer::spawn().await;
    let expired = mint_jwt("admin", Utc::now() - ChronoDuration::hours(2), ChronoDuration::hours(1));

    let res = reqwest::Client::new()
        .get(srv.url("/api/whoami"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["authenticated"], false);
}

#[tokio::test]
async fn whoami_reflects_resolved_permissions_not_token_roles() {
    let srv = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .get(srv.url("/api/whoami"))
        .bearer_auth(token("viewer"))
        .send()
        .await
        .unwrap();

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["subject"], "viewer");
    assert_eq!(body["data"]["roles"], json!(["viewer"]));
    assert!(
        body["data"]["permissions"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p == "supplier:query")
    );
}

#[tokio::test]
async fn protected_routes_distinguish_401_and_403() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/suppliers")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 401);
    assert_eq!(body["message"], "认证失败，请重新登录");

    let res = client
        .post(srv.url("/api/suppliers"))
        .bearer_auth(token("viewer"))
        .json(&json!({ "name": "华东钢材" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 403);
}

#[tokio::test]
async fn disabled_user_is_treated_as_anonymous() {
    let srv = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .get(srv.url("/api/suppliers"))
        .bearer_auth(token("gone"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn supplier_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let buyer = token("buyer");

    let res = client
        .post(srv.url("/api/suppliers"))
        .bearer_auth(&buyer)
        .json(&json!({ "name": "华东钢材", "email": "sales@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let id = body["data"]["id"].as_u64().unwrap();

    // Duplicate name: business error, transported as 400.
    let res = client
        .post(srv.url("/api/suppliers"))
        .bearer_auth(&buyer)
        .json(&json!({ "name": "华东钢材" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 12001);

    let res = client
        .get(srv.url(&format!("/api/suppliers/{id}")))
        .bearer_auth(&buyer)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["name"], "华东钢材");

    // Purchasers cannot delete.
    let res = client
        .delete(srv.url(&format!("/api/suppliers/{id}")))
        .bearer_auth(&buyer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .delete(srv.url(&format!("/api/suppliers/{id}")))
        .bearer_auth(token("admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_supplier_body_is_a_validation_error() {
    let srv = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .post(srv.url("/api/suppliers"))
        .bearer_auth(token("admin"))
        .json(&json!({ "name": "", "phone": "abc" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 400);
    assert_eq!(body["message"], "name: 不能为空, phone: 联系电话格式不正确");
}

#[tokio::test]
async fn inventory_adjust_requires_both_permissions() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Viewers only hold inventory:query.
    let res = client
        .post(srv.url("/api/inventory/7/adjust"))
        .bearer_auth(token("viewer"))
        .json(&json!({ "delta": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let keeper = token("keeper");
    let res = client
        .post(srv.url("/api/inventory/7/adjust"))
        .bearer_auth(&keeper)
        .json(&json!({ "delta": 5, "reason": "入库" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["quantity"], 5);

    let res = client
        .post(srv.url("/api/inventory/7/adjust"))
        .bearer_auth(&keeper)
        .json(&json!({ "delta": -6 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 14001);
    assert_eq!(body["message"], "库存不足");

    let res = client
        .get(srv.url("/api/inventory/7"))
        .bearer_auth(&keeper)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["quantity"], 5);
}

#[tokio::test]
async fn category_listing_accepts_either_permission() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/categories"))
        .bearer_auth(token("admin"))
        .json(&json!({ "name": "钢材" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    for user in ["viewer", "keeper", "buyer"] {
        let res = client
            .get(srv.url("/api/categories"))
            .bearer_auth(token(user))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "user {user}");
    }
}

async fn login(srv: &TestServer, username: &str, password: &str) -> (StatusCode, Value) {
    let res = reqwest::Client::new()
        .post(srv.url("/api/auth/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn login_issues_a_token_the_pipeline_accepts() {
    let srv = TestServer::spawn().await;

    let (status, body) = login(&srv, "admin", "admin-pw").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(body["data"]["tokenType"], "Bearer");
    assert_eq!(body["data"]["username"], "admin");
    assert_eq!(body["data"]["roles"], json!(["admin"]));
    assert!(body["requestId"].is_string());
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let res = reqwest::Client::new()
        .get(srv.url("/api/suppliers"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_with_bad_credentials_is_a_business_error() {
    let srv = TestServer::spawn().await;

    let (status, wrong_password) = login(&srv, "admin", "nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_password["code"], 10_006);
    assert!(wrong_password["data"].is_null());

    // Unknown user and wrong password are indistinguishable.
    let (status, unknown) = login(&srv, "mallory", "nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown["code"], wrong_password["code"]);
    assert_eq!(unknown["message"], wrong_password["message"]);

    // Users without a stored password cannot log in.
    let (_, no_password) = login(&srv, "viewer", "anything").await;
    assert_eq!(no_password["code"], 10_006);
}

#[tokio::test]
async fn login_checks_account_status() {
    let srv = TestServer::spawn().await;

    let (status, body) = login(&srv, "gone", "gone-pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 10_002);
    assert_eq!(body["message"], "用户已被禁用");

    let (_, body) = login(&srv, "gone", "guess").await;
    assert_eq!(body["code"], 10_006);
}

#[tokio::test]
async fn login_validates_its_body() {
    let srv = TestServer::spawn().await;
    let (status, body) = login(&srv, "  ", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}
