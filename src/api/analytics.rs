use axum::{extract::State, Json};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::auth::Claims;
use crate::services::analytics_service;

use super::{domain_error, ApiResult};

pub async fn get_analytics(State(db): State<DatabaseConnection>, claims: Claims) -> ApiResult {
    claims.require_role("admin")?;

    let analytics = analytics_service::aggregate_analytics(&db)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({ "analytics": analytics })))
}
