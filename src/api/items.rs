use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Claims;
use crate::domain::validation::{rule, validate, Constraint, Rule};
use crate::models::item::{Entity as Item, ItemDto};
use crate::services::{item_service, notification_service};
use crate::state::AppState;

use super::{domain_error, ApiResult};

const ITEM_RULES: &[Rule] = &[
    rule("name", Constraint::Required),
    rule("name", Constraint::MaxLen(100)),
    rule("category", Constraint::Required),
    rule("description", Constraint::Required),
    rule("price_per_day", Constraint::Required),
    rule("price_per_day", Constraint::PositiveMoney),
];

#[derive(Deserialize)]
pub struct ListItemsQuery {
    pub available: Option<bool>,
    pub category: Option<String>,
    #[serde(default)]
    pub new: bool,
}

pub async fn list_items(
    State(db): State<DatabaseConnection>,
    Query(query): Query<ListItemsQuery>,
) -> ApiResult {
    let filter = item_service::ItemFilter {
        available: query.available,
        category: query.category,
        new_only: query.new,
    };
    let items = item_service::list_items(&db, filter)
        .await
        .map_err(domain_error)?;

    let now = Utc::now();
    let result: Vec<serde_json::Value> = items
        .iter()
        .map(|i| {
            let mut v = serde_json::to_value(i).unwrap_or_default();
            // The stored flag alone is stale once the window has passed
            v["is_new"] = json!(item_service::is_new(i, now));
            v
        })
        .collect();

    Ok(Json(json!({ "items": result, "total": result.len() })))
}

pub async fn get_item(State(db): State<DatabaseConnection>, Path(id): Path<i32>) -> ApiResult {
    let found = Item::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| domain_error(e.into()))?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Item not found" })),
        ))?;

    Ok(Json(json!({ "item": found })))
}

pub async fn create_item(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(dto): Json<ItemDto>,
) -> ApiResult {
    claims.require_role("admin")?;

    let as_value = serde_json::to_value(&dto).unwrap_or_default();
    validate(ITEM_RULES, &as_value).map_err(domain_error)?;

    let saved = item_service::create_item(&db, claims.uid, dto)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({
        "message": "Item added successfully! Users will be notified about this new item.",
        "item": saved
    })))
}

pub async fn update_item(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(dto): Json<ItemDto>,
) -> ApiResult {
    claims.require_role("admin")?;

    let as_value = serde_json::to_value(&dto).unwrap_or_default();
    validate(ITEM_RULES, &as_value).map_err(domain_error)?;

    let updated = item_service::update_item(&db, id, dto)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({
        "message": "Item updated successfully",
        "item": updated
    })))
}

pub async fn delete_item(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult {
    claims.require_role("admin")?;

    item_service::delete_item(&db, id)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({ "message": "Item deleted successfully" })))
}

#[derive(Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub available: bool,
}

/// Admin availability toggle. A false-to-true flip triggers the restock
/// fan-out, same as a return.
pub async fn set_availability(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<AvailabilityRequest>,
) -> ApiResult {
    claims.require_role("admin")?;

    let (updated, restocked) = item_service::set_available(state.db(), id, payload.available)
        .await
        .map_err(domain_error)?;

    let mut notified = 0;
    if restocked {
        notified =
            notification_service::notify_restocked(state.db(), state.mailer.as_ref(), &updated)
                .await
                .map_err(domain_error)?;
    }

    Ok(Json(json!({
        "message": format!(
            "Item '{}' is now {}",
            updated.name,
            if updated.is_available { "available" } else { "unavailable" }
        ),
        "item": updated,
        "subscribers_notified": notified
    })))
}
