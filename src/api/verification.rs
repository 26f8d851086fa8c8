use axum::{
    extract::{Path, State},
    Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Claims;
use crate::domain::validation::{rule, validate, Constraint, Rule};
use crate::services::verification_service;

use super::{domain_error, ApiResult};

const VERIFICATION_RULES: &[Rule] = &[
    rule("id_number", Constraint::Required),
    rule("id_number", Constraint::Digits(12)),
    rule("doc_front", Constraint::Required),
    rule("doc_back", Constraint::Required),
];

#[derive(Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id_number: String,
    pub doc_front: String,
    pub doc_back: String,
}

pub async fn submit(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<VerificationRequest>,
) -> ApiResult {
    claims.require_role("user")?;

    let as_value = serde_json::to_value(&payload).unwrap_or_default();
    validate(VERIFICATION_RULES, &as_value).map_err(domain_error)?;

    verification_service::submit_verification(
        &db,
        claims.uid,
        payload.id_number,
        payload.doc_front,
        payload.doc_back,
    )
    .await
    .map_err(domain_error)?;

    Ok(Json(json!({
        "message": "Documents uploaded successfully! Waiting for admin verification."
    })))
}

/// Verification queue for admin review. Full rows so the submitted id number
/// and document references are visible.
pub async fn list_pending(State(db): State<DatabaseConnection>, claims: Claims) -> ApiResult {
    claims.require_role("admin")?;

    let pending = verification_service::list_pending(&db)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({ "pending": pending, "total": pending.len() })))
}

pub async fn approve(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(user_id): Path<i32>,
) -> ApiResult {
    claims.require_role("admin")?;

    let updated = verification_service::approve_verification(&db, user_id)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({
        "message": format!("Identity verified for {}", updated.username)
    })))
}

pub async fn reject(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(user_id): Path<i32>,
) -> ApiResult {
    claims.require_role("admin")?;

    let updated = verification_service::reject_verification(&db, user_id)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({
        "message": format!(
            "Verification rejected for {}. User needs to re-upload.",
            updated.username
        )
    })))
}
