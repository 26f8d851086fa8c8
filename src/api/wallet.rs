use axum::{extract::State, http::StatusCode, Json};
use sea_orm::*;
use serde_json::json;

use crate::auth::Claims;
use crate::models::rental::{self, Entity as Rental};
use crate::models::user::Entity as User;

use super::{domain_error, ApiResult};

/// Wallet balance plus refund history, newest refund first.
pub async fn get_wallet(State(db): State<DatabaseConnection>, claims: Claims) -> ApiResult {
    claims.require_role("user")?;

    let account = User::find_by_id(claims.uid)
        .one(&db)
        .await
        .map_err(|e| domain_error(e.into()))?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Account not found" })),
        ))?;

    let refunds = Rental::find()
        .filter(rental::Column::UserId.eq(claims.uid))
        .filter(rental::Column::RefundProcessed.eq(true))
        .order_by_desc(rental::Column::RefundDate)
        .all(&db)
        .await
        .map_err(|e| domain_error(e.into()))?;

    let history: Vec<serde_json::Value> = refunds
        .iter()
        .map(|r| {
            json!({
                "rental_id": r.id,
                "item_id": r.item_id,
                "refund_amount": r.refund_amount,
                "refund_date": r.refund_date,
            })
        })
        .collect();

    Ok(Json(json!({
        "wallet_balance": account.wallet_balance,
        "refund_history": history
    })))
}
