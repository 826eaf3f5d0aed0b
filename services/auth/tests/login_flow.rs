//! End-to-end tests of the HTTP surface over the in-memory stores

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use daybook_auth::{
    AppState,
    credentials::hash_password,
    jwt::{Claims, JwtService},
    models::{NewUser, User},
    repositories::{MemoryStore, Stores, UserStore},
    routes::create_router,
    settings::AuthTokenSettings,
};

const SECRET: &str = "integration-secret";
const PASSWORD: &str = "Passw0rd!";

struct TestApp {
    store: Arc<MemoryStore>,
    state: AppState,
    router: Router,
    user: User,
}

async fn spawn_app(settings: AuthTokenSettings) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let user = store
        .create(&NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
        })
        .await
        .unwrap();

    let state = AppState::new(settings, Stores::memory(store.clone())).unwrap();
    let router = create_router(state.clone());

    TestApp {
        store,
        state,
        router,
        user,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_login(username: &str, password: &str) -> Request<Body> {
    Request::post("/auth/token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": username, "password": password }).to_string(),
        ))
        .unwrap()
}

fn authorized(uri: &str, authorization: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_json_login_returns_token_and_user() {
    let app = spawn_app(AuthTokenSettings::with_secret(SECRET)).await;

    let (status, body) = send(&app.router, json_login("alice", PASSWORD)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["expiry"].as_str().is_some_and(|e| e.ends_with('Z')));
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["id"], app.user.id.to_string());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_form_login_by_email() {
    let app = spawn_app(AuthTokenSettings::with_secret(SECRET)).await;

    let request = Request::post("/auth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=alice%40example.com&password=Passw0rd%21"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
}

#[tokio::test]
async fn test_multipart_login() {
    let app = spawn_app(AuthTokenSettings::with_secret(SECRET)).await;

    let boundary = "daybook-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nalice\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"password\"\r\n\r\n{p}\r\n\
         --{b}--\r\n",
        b = boundary,
        p = PASSWORD
    );
    let request = Request::post("/auth/token")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn test_bad_credentials_count_then_reset() {
    let app = spawn_app(AuthTokenSettings::with_secret(SECRET)).await;

    for _ in 0..3 {
        let (status, body) = send(&app.router, json_login("alice", "wrong")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "error": "Unable to log in with provided credentials.",
                "code": "authorization",
            })
        );
    }
    let failures = app.state.login_service.failed_attempts(Some("alice")).await;
    assert_eq!(failures.unwrap(), 3);

    let (status, _) = send(&app.router, json_login("alice", PASSWORD)).await;
    assert_eq!(status, StatusCode::OK);
    let failures = app.state.login_service.failed_attempts(Some("alice")).await;
    assert_eq!(failures.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_password_is_rejected() {
    let app = spawn_app(AuthTokenSettings::with_secret(SECRET)).await;

    let request = Request::post("/auth/token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "username": "alice" }).to_string()))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Must include \"username\" and \"password\".");
    assert_eq!(body["code"], "authorization");
}

#[tokio::test]
async fn test_unsupported_body_encoding() {
    let app = spawn_app(AuthTokenSettings::with_secret(SECRET)).await;

    let request = Request::post("/auth/token")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("alice:Passw0rd!"))
        .unwrap();
    let (status, _) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_register_then_login() {
    let app = spawn_app(AuthTokenSettings::with_secret(SECRET)).await;

    let register = |username: &str, email: &str, password: &str| {
        Request::post("/accounts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "username": username, "email": email, "password": password })
                    .to_string(),
            ))
            .unwrap()
    };

    let (status, body) = send(
        &app.router,
        register("bob", "Bob@Example.com", "S3cure!pass"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "bob");

    let stored = app.store.find_by_email("bob@example.com").await.unwrap();
    assert!(stored.is_some());

    let (status, _) = send(
        &app.router,
        register("bob", "other@example.com", "S3cure!pass"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app.router, register("carol", "carol@example.com", "weak")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let malformed = Request::post("/accounts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\": \"carol\""))
        .unwrap();
    let (status, body) = send(&app.router, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

    let (status, _) = send(&app.router, json_login("bob@example.com", "S3cure!pass")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_guards_current_account() {
    let app = spawn_app(AuthTokenSettings::with_secret(SECRET)).await;

    let (_, body) = send(&app.router, json_login("alice", PASSWORD)).await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app.router,
        authorized("/accounts/me", &format!("Token {}", token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (status, _) = send(
        &app.router,
        authorized("/accounts/me", &format!("Bearer {}", token)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::get("/accounts/me").body(Body::empty()).unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_custom_header_prefix() {
    let mut settings = AuthTokenSettings::with_secret(SECRET);
    settings.auth_header_prefix = "Bearer".to_string();
    let app = spawn_app(settings).await;

    let (_, body) = send(&app.router, json_login("alice", PASSWORD)).await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app.router,
        authorized("/accounts/me", &format!("Bearer {}", token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app.router,
        authorized("/accounts/me", &format!("Token {}", token)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_reports_expiry() {
    let settings = AuthTokenSettings::with_secret(SECRET);
    let jwt = JwtService::new(&settings).unwrap();
    let app = spawn_app(settings).await;

    let now = Utc::now().timestamp();
    let key = jwt
        .encode_claims(&Claims {
            sub: app.user.id,
            jti: Uuid::new_v4(),
            iat: now - 4000,
            exp: now - 1000,
        })
        .unwrap();

    let (status, body) = send(
        &app.router,
        authorized("/accounts/me", &format!("Token {}", key)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token expired.");
}

#[tokio::test]
async fn test_login_events_capture_proxy_chain() {
    let app = spawn_app(AuthTokenSettings::with_secret(SECRET)).await;

    let peer: SocketAddr = "10.0.0.9:52000".parse().unwrap();
    let mut request = json_login("alice", PASSWORD);
    request.extensions_mut().insert(ConnectInfo(peer));
    request.headers_mut().insert(
        "x-forwarded-for",
        "203.0.113.7, 198.51.100.1, 172.16.0.2".parse().unwrap(),
    );
    request.headers_mut().insert(
        header::USER_AGENT,
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0"
            .parse()
            .unwrap(),
    );

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, events) = send(
        &app.router,
        authorized("/auth/login-events?limit=1", &format!("Token {}", token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["username"], "alice");
    assert_eq!(events[0]["ip_address"], "203.0.113.7");
    assert_eq!(events[0]["forwarded_by"], "10.0.0.9,172.16.0.2,198.51.100.1");
    assert_eq!(events[0]["os"], "Ubuntu");
    assert_eq!(events[0]["success"], true);
}

#[tokio::test]
async fn test_projection_can_be_dropped() {
    let store = Arc::new(MemoryStore::new());
    store
        .create(&NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
        })
        .await
        .unwrap();

    let state = AppState::new(
        AuthTokenSettings::with_secret(SECRET),
        Stores::memory(store),
    )
    .unwrap()
    .with_user_projection(None);
    let router = create_router(state);

    let (status, body) = send(&router, json_login("alice", PASSWORD)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("user").is_none());
    assert!(body["token"].is_string());
}
