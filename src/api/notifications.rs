use axum::{
    extract::{Path, State},
    Json,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::auth::Claims;
use crate::services::notification_service;
use crate::state::AppState;

use super::{domain_error, ApiResult};

pub async fn subscribe(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(item_id): Path<i32>,
) -> ApiResult {
    claims.require_role("user")?;

    let outcome = notification_service::subscribe(&db, claims.uid, item_id)
        .await
        .map_err(domain_error)?;

    let message = if outcome.created {
        "You'll be notified when this item is back in stock!"
    } else {
        "You're already subscribed to notifications for this item"
    };

    Ok(Json(json!({
        "message": message,
        "subscription": outcome.subscription,
        "created": outcome.created
    })))
}

pub async fn unsubscribe(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult {
    claims.require_role("user")?;

    notification_service::unsubscribe(&db, claims.uid, id)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({ "message": "Notification removed" })))
}

pub async fn list_subscriptions(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> ApiResult {
    claims.require_role("user")?;

    let subs = notification_service::list_subscriptions(&db, claims.uid)
        .await
        .map_err(domain_error)?;

    let result: Vec<serde_json::Value> = subs
        .into_iter()
        .map(|(sub, subscribed_item)| {
            json!({
                "id": sub.id,
                "item_id": sub.item_id,
                "notified": sub.notified,
                "created_at": sub.created_at,
                "item_name": subscribed_item.map(|i| i.name),
            })
        })
        .collect();

    Ok(Json(json!({ "subscriptions": result })))
}

/// Admin-triggered reminder pass over active rentals near their deadline.
pub async fn send_deadline_reminders(State(state): State<AppState>, claims: Claims) -> ApiResult {
    claims.require_role("admin")?;

    let sent = notification_service::send_deadline_reminders(state.db(), state.mailer.as_ref())
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({
        "message": format!("{} reminder(s) sent", sent),
        "sent": sent
    })))
}
