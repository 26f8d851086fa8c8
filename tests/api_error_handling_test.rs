use agrirent::auth::{create_jwt, hash_password, verify_password};
use agrirent::db;
use agrirent::mailer::LogMailer;
use agrirent::models::{login_token, user};
use agrirent::state::AppState;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serial_test::serial;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

// Tests that mint or verify tokens share the process-wide JWT secret, so they
// pin it and run serialized.
fn pin_jwt_secret() {
    std::env::set_var("JWT_SECRET", "test-secret");
}

async fn setup_app() -> (Router, DatabaseConnection) {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let state = AppState::with_mailer(db.clone(), Arc::new(LogMailer));
    (agrirent::api::api_router(state), db)
}

async fn create_account(db: &DatabaseConnection, username: &str, role: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let account = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        role: Set(role.to_string()),
        status: Set("approved".to_string()),
        password_hash: Set(Some(hash_password("password123").unwrap())),
        is_verified: Set(true),
        wallet_balance: Set("0.00".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    user::Entity::insert(account)
        .exec(db)
        .await
        .expect("Failed to create account")
        .last_insert_id
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _db) = setup_app().await;

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_auth_rejected() {
    let (app, _db) = setup_app().await;

    let req = Request::builder()
        .uri("/rentals")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let (app, _db) = setup_app().await;

    let req = Request::builder()
        .uri("/rentals")
        .header("Authorization", "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_user_cannot_reach_admin_routes() {
    pin_jwt_secret();
    let (app, db) = setup_app().await;
    let user_id = create_account(&db, "alice", "user").await;
    let token = create_jwt(user_id, "alice", "user").unwrap();

    for uri in ["/analytics", "/users", "/verification/pending"] {
        let req = Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "route {}", uri);
    }
}

#[tokio::test]
#[serial]
async fn test_unknown_rental_is_404() {
    pin_jwt_secret();
    let (app, db) = setup_app().await;
    let admin_id = create_account(&db, "admin", "admin").await;
    let token = create_jwt(admin_id, "admin", "admin").unwrap();

    let req = Request::builder()
        .uri("/rentals/9999")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let (app, _db) = setup_app().await;

    let payload = serde_json::json!({
        "username": "alice",
        "email": "alice@example.com"
    });

    let req = Request::builder()
        .method("POST")
        .uri("/auth/signup")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/signup")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_validates_email() {
    let (app, _db) = setup_app().await;

    let payload = serde_json::json!({
        "username": "alice",
        "email": "not-an-email"
    });

    let req = Request::builder()
        .method("POST")
        .uri("/auth/signup")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_login_rejects_wrong_password() {
    let (app, db) = setup_app().await;
    create_account(&db, "admin", "admin").await;

    let payload = serde_json::json!({
        "username": "admin",
        "password": "wrong"
    });
    let req = Request::builder()
        .method("POST")
        .uri("/auth/admin/login")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A regular user account never gets in here, even with the right password
    create_account(&db, "bob", "user").await;
    let payload = serde_json::json!({
        "username": "bob",
        "password": "password123"
    });
    let req = Request::builder()
        .method("POST")
        .uri("/auth/admin/login")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_admin_login_succeeds() {
    pin_jwt_secret();
    let (app, db) = setup_app().await;
    create_account(&db, "admin", "admin").await;

    let payload = serde_json::json!({
        "username": "admin",
        "password": "password123"
    });
    let req = Request::builder()
        .method("POST")
        .uri("/auth/admin/login")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
#[serial]
async fn test_otp_flow_end_to_end() {
    pin_jwt_secret();
    let (app, db) = setup_app().await;
    let user_id = create_account(&db, "alice", "user").await;

    let payload = serde_json::json!({
        "username": "alice",
        "email": "alice@example.com"
    });
    let req = Request::builder()
        .method("POST")
        .uri("/auth/otp/request")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Pull the code out of the database, the way the user reads their inbox
    let token_row = login_token::Entity::find()
        .filter(login_token::Column::UserId.eq(user_id))
        .filter(login_token::Column::Used.eq(false))
        .one(&db)
        .await
        .unwrap()
        .expect("OTP row should exist");
    assert_eq!(token_row.code.len(), 7);

    let payload = serde_json::json!({
        "username": "alice",
        "code": token_row.code
    });
    let req = Request::builder()
        .method("POST")
        .uri("/auth/otp/verify")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["account"]["username"], "alice");

    // The code is single use
    let payload = serde_json::json!({
        "username": "alice",
        "code": token_row.code
    });
    let req = Request::builder()
        .method("POST")
        .uri("/auth/otp/verify")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_hashing() {
    let password = "super_secret_password";
    let hash = hash_password(password).expect("Failed to hash password");

    assert_ne!(password, hash);
    assert!(verify_password(password, &hash).unwrap());
    assert!(!verify_password("wrong_password", &hash).unwrap());
}
