use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{create_jwt, verify_password, Claims};
use crate::domain::validation::{rule, validate, Constraint, Rule};
use crate::models::user::{self, AccountDto, Entity as User};
use crate::services::otp_service;
use crate::state::AppState;

use super::{domain_error, ApiResult};

const SIGNUP_RULES: &[Rule] = &[
    rule("username", Constraint::Required),
    rule("username", Constraint::MaxLen(150)),
    rule("email", Constraint::Required),
    rule("email", Constraint::Email),
    rule("phone", Constraint::MaxLen(15)),
];

#[derive(Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

pub async fn signup(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult {
    let as_value = serde_json::to_value(&payload).unwrap_or_default();
    validate(SIGNUP_RULES, &as_value).map_err(domain_error)?;

    // Duplicate unique fields are rejected before any mutation
    let duplicate = User::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(payload.username.trim()))
                .add(user::Column::Email.eq(payload.email.trim())),
        )
        .one(&db)
        .await
        .map_err(|e| domain_error(e.into()))?;

    if duplicate.is_some() {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": "Username or email already registered" })),
        ));
    }

    let now = Utc::now().to_rfc3339();
    let account = user::ActiveModel {
        username: Set(payload.username.trim().to_owned()),
        email: Set(payload.email.trim().to_owned()),
        role: Set("user".to_owned()),
        phone: Set(payload.phone),
        address: Set(payload.address),
        status: Set("approved".to_owned()), // signup auto-approves
        is_verified: Set(false),
        wallet_balance: Set("0.00".to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = account
        .insert(&db)
        .await
        .map_err(|e| domain_error(e.into()))?;

    tracing::info!("Account created: {}", saved.username);
    Ok(Json(json!({
        "message": "Signup successful! Please sign in via OTP.",
        "account": AccountDto::from(saved)
    })))
}

#[derive(Deserialize)]
pub struct OtpRequest {
    pub username: String,
    pub email: String,
}

pub async fn request_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpRequest>,
) -> ApiResult {
    otp_service::request_code(
        state.db(),
        state.mailer.as_ref(),
        payload.username.trim(),
        payload.email.trim(),
    )
    .await
    .map_err(domain_error)?;

    Ok(Json(json!({ "message": "OTP sent to your email!" })))
}

const OTP_VERIFY_RULES: &[Rule] = &[
    rule("username", Constraint::Required),
    rule("code", Constraint::Required),
    rule("code", Constraint::Digits(7)),
];

#[derive(Serialize, Deserialize)]
pub struct OtpVerifyRequest {
    pub username: String,
    pub code: String,
}

pub async fn verify_otp(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<OtpVerifyRequest>,
) -> ApiResult {
    let as_value = serde_json::to_value(&payload).unwrap_or_default();
    validate(OTP_VERIFY_RULES, &as_value).map_err(domain_error)?;

    let account = otp_service::verify_code(&db, payload.username.trim(), payload.code.trim())
        .await
        .map_err(domain_error)?;

    let token = create_jwt(account.id, &account.username, &account.role).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e })),
        )
    })?;

    Ok(Json(json!({
        "token": token,
        "account": AccountDto::from(account)
    })))
}

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn admin_login(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<AdminLoginRequest>,
) -> ApiResult {
    tracing::info!("Admin login attempt for: {}", payload.username);

    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials" })),
        )
    };

    let account = User::find()
        .filter(user::Column::Username.eq(payload.username.trim()))
        .filter(user::Column::Role.eq("admin"))
        .one(&db)
        .await
        .map_err(|e| domain_error(e.into()))?
        .ok_or_else(unauthorized)?;

    let hash = account.password_hash.as_deref().ok_or_else(unauthorized)?;
    match verify_password(&payload.password, hash) {
        Ok(true) => {
            let token = create_jwt(account.id, &account.username, &account.role).map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e })),
                )
            })?;
            Ok(Json(json!({ "token": token })))
        }
        _ => {
            tracing::warn!("Password verification failed for: {}", payload.username);
            Err(unauthorized())
        }
    }
}

pub async fn get_me(State(db): State<DatabaseConnection>, claims: Claims) -> ApiResult {
    let account = User::find_by_id(claims.uid)
        .one(&db)
        .await
        .map_err(|e| domain_error(e.into()))?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Account not found" })),
        ))?;

    Ok(Json(json!({ "account": AccountDto::from(account) })))
}
