//! Handler tests for the accounts domain
//!
//! Exercise the auth router against a real Postgres container: request
//! deserialization, status codes and the error document shape. These cover
//! only the users domain routers, not the full application with the ability
//! middleware in front.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum_helpers::{JwtAuth, JwtConfig};
use domain_users::handlers::{self, UsersState, resource_configs};
use domain_users::{PgRoleRepository, PgUserRepository, UserService};
use http_body_util::BodyExt;
use query_options::ResourceRegistry;
use serde_json::{Value, json};
use test_utils::{TestDatabase, TestDataBuilder};
use tower::ServiceExt; // For oneshot()

const TEST_SECRET: &str = "test-secret-test-secret-test-secret!";

fn auth_app(db: &TestDatabase) -> Router {
    let jwt = JwtAuth::new(&JwtConfig::new(TEST_SECRET));
    let state = Arc::new(UsersState {
        service: UserService::new(
            PgUserRepository::new(db.connection()),
            PgRoleRepository::new(db.connection()),
            jwt,
        ),
        registry: Arc::new(ResourceRegistry::new(resource_configs())),
    });
    handlers::auth_router(state)
}

async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn signup_creates_account_and_returns_token() {
    let db = TestDatabase::new().await;
    let app = auth_app(&db);
    let builder = TestDataBuilder::from_test_name("signup_201");

    let response = app
        .oneshot(post_json(
            "/signup",
            &json!({
                "email": builder.email("signup"),
                "name": "Signup Test",
                "password": "correct horse battery staple"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response.into_body()).await;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], json!(builder.email("signup")));
}

#[tokio::test]
async fn duplicate_email_is_a_validation_error() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("signup_dup");
    let payload = json!({
        "email": builder.email("dup"),
        "name": "First",
        "password": "correct horse battery staple"
    });

    let first = auth_app(&db)
        .oneshot(post_json("/signup", &payload))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = auth_app(&db)
        .oneshot(post_json("/signup", &payload))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(second.into_body()).await;
    assert_eq!(body["errors"][0]["status"], json!("422"));
}

#[tokio::test]
async fn login_with_wrong_password_returns_401() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("login_401");

    let created = auth_app(&db)
        .oneshot(post_json(
            "/signup",
            &json!({
                "email": builder.email("login"),
                "name": "Login Test",
                "password": "correct horse battery staple"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let response = auth_app(&db)
        .oneshot(post_json(
            "/login",
            &json!({
                "email": builder.email("login"),
                "password": "not the password"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_without_token_returns_401() {
    let db = TestDatabase::new().await;

    let response = auth_app(&db)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_rejects_short_password() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("signup_short_pw");

    let response = auth_app(&db)
        .oneshot(post_json(
            "/signup",
            &json!({
                "email": builder.email("short"),
                "name": "Short",
                "password": "short"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
