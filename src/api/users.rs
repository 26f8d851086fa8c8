use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Claims;
use crate::domain::validation::{rule, validate, Constraint, Rule};
use crate::models::user::{self, AccountDto, Entity as User};

use super::{domain_error, ApiResult};

pub async fn list_users(State(db): State<DatabaseConnection>, claims: Claims) -> ApiResult {
    claims.require_role("admin")?;

    let users = User::find()
        .filter(user::Column::Role.eq("user"))
        .all(&db)
        .await
        .map_err(|e| domain_error(e.into()))?;

    let accounts: Vec<AccountDto> = users.into_iter().map(AccountDto::from).collect();
    Ok(Json(json!({ "users": accounts, "total": accounts.len() })))
}

const STATUS_RULES: &[Rule] = &[
    rule("status", Constraint::Required),
    rule("status", Constraint::OneOf(&["pending", "approved", "rejected"])),
];

#[derive(Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn change_status(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<StatusRequest>,
) -> ApiResult {
    claims.require_role("admin")?;

    let as_value = serde_json::to_value(&payload).unwrap_or_default();
    validate(STATUS_RULES, &as_value).map_err(domain_error)?;

    let found = User::find_by_id(id)
        .filter(user::Column::Role.eq("user"))
        .one(&db)
        .await
        .map_err(|e| domain_error(e.into()))?
        .ok_or_else(|| {
            domain_error(crate::domain::DomainError::NotFound)
        })?;

    let username = found.username.clone();
    let mut active: user::ActiveModel = found.into();
    active.status = Set(payload.status.clone());
    active.updated_at = Set(Utc::now().to_rfc3339());
    active.update(&db).await.map_err(|e| domain_error(e.into()))?;

    Ok(Json(json!({
        "message": format!("User '{}' status updated to {}", username, payload.status)
    })))
}
