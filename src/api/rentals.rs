use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Claims;
use crate::domain::money::{format_amount, parse_amount};
use crate::domain::validation::{rule, validate, Constraint, Rule};
use crate::services::{invoice_service, notification_service, rental_service};
use crate::state::AppState;

use super::{domain_error, ApiError, ApiResult};

#[derive(Deserialize)]
pub struct ListRentalsQuery {
    pub status: Option<String>,
    pub user_id: Option<i32>,
    pub item_id: Option<i32>,
}

/// Users see their own rentals; admins see everything, optionally filtered.
pub async fn list_rentals(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Query(query): Query<ListRentalsQuery>,
) -> ApiResult {
    let filter = if claims.role == "admin" {
        rental_service::RentalFilter {
            user_id: query.user_id,
            item_id: query.item_id,
            status: query.status,
        }
    } else {
        rental_service::RentalFilter {
            user_id: Some(claims.uid),
            item_id: query.item_id,
            status: query.status,
        }
    };

    let rentals = rental_service::list_rentals(&db, filter)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({ "rentals": rentals, "total": rentals.len() })))
}

pub async fn get_rental(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult {
    let (found, renter, rented_item) = rental_service::find_with_relations(&db, id)
        .await
        .map_err(domain_error)?;

    if claims.role != "admin" && found.user_id != claims.uid {
        return Err(not_yours());
    }

    Ok(Json(json!({
        "rental": found,
        "username": renter.username,
        "item": rented_item,
        "days_until_deadline": rental_service::days_until_deadline(&found, Utc::now()),
    })))
}

#[derive(Deserialize)]
pub struct CreateRentalRequest {
    pub item_id: i32,
}

/// Rental request with terms accepted at creation.
pub async fn create_rental(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<CreateRentalRequest>,
) -> ApiResult {
    claims.require_role("user")?;

    let saved = rental_service::create_rental(&db, claims.uid, payload.item_id)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({
        "message": "Terms accepted! Please proceed with advance payment.",
        "rental": saved
    })))
}

/// Payment screen data: the advance owed and where to send it.
pub async fn payment_info(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult {
    let (found, _, rented_item) = rental_service::find_with_relations(state.db(), id)
        .await
        .map_err(domain_error)?;

    if found.user_id != claims.uid {
        return Err(not_yours());
    }
    if found.advance_paid {
        return Ok(Json(json!({
            "message": "Payment already completed for this rental."
        })));
    }

    let price = parse_amount(&rented_item.price_per_day).map_err(domain_error)?;
    Ok(Json(json!({
        "rental_id": found.id,
        "item_name": rented_item.name,
        "advance_amount": format_amount(rental_service::advance_amount(price)),
        "payment_vpa": state.payment_vpa,
    })))
}

#[derive(Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_method: String,
    pub payment_reference: Option<String>,
}

pub async fn confirm_payment(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> ApiResult {
    claims.require_role("user")?;

    if payload.payment_method != "upi" {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid payment method" })),
        ));
    }

    let updated =
        rental_service::confirm_payment(&db, claims.uid, id, payload.payment_reference)
            .await
            .map_err(domain_error)?;

    Ok(Json(json!({
        "message": "Payment successful!",
        "rental": updated
    })))
}

const STATUS_RULES: &[Rule] = &[
    rule("status", Constraint::Required),
    rule("status", Constraint::OneOf(&["approved", "rejected"])),
];

#[derive(Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn set_status(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<StatusRequest>,
) -> ApiResult {
    claims.require_role("admin")?;

    let as_value = serde_json::to_value(&payload).unwrap_or_default();
    validate(STATUS_RULES, &as_value).map_err(domain_error)?;

    let updated = rental_service::set_status(&db, id, &payload.status)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({
        "message": format!("Rental request updated to {}", updated.status),
        "rental": updated
    })))
}

const RETURN_RULES: &[Rule] = &[
    rule("condition", Constraint::Required),
    rule("condition", Constraint::OneOf(&["excellent", "good", "damaged"])),
    rule("notes", Constraint::MaxLen(2000)),
];

#[derive(Serialize, Deserialize)]
pub struct ReturnRequest {
    pub condition: String,
    pub notes: Option<String>,
}

/// User return. The restock fan-out runs after the state change commits.
pub async fn return_rental(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<ReturnRequest>,
) -> ApiResult {
    claims.require_role("user")?;

    let as_value = serde_json::to_value(&payload).unwrap_or_default();
    validate(RETURN_RULES, &as_value).map_err(domain_error)?;

    let (updated, restocked) = rental_service::return_rental(
        state.db(),
        claims.uid,
        id,
        &payload.condition,
        payload.notes,
    )
    .await
    .map_err(domain_error)?;

    // Send failures are logged inside the fan-out; the return stands either way
    let notified =
        notification_service::notify_restocked(state.db(), state.mailer.as_ref(), &restocked)
            .await
            .map_err(domain_error)?;

    Ok(Json(json!({
        "message": format!("Successfully returned {}. Thank you!", restocked.name),
        "rental": updated,
        "subscribers_notified": notified
    })))
}

const DAMAGE_RULES: &[Rule] = &[
    rule("penalty_amount", Constraint::Money),
    rule("damage_report", Constraint::MaxLen(2000)),
    rule("admin_notes", Constraint::MaxLen(2000)),
];

#[derive(Serialize, Deserialize)]
pub struct DamageRequest {
    pub penalty_amount: Option<String>,
    pub damage_report: Option<String>,
    pub admin_notes: Option<String>,
}

pub async fn update_damage(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<DamageRequest>,
) -> ApiResult {
    claims.require_role("admin")?;

    let as_value = serde_json::to_value(&payload).unwrap_or_default();
    validate(DAMAGE_RULES, &as_value).map_err(domain_error)?;

    let updated = rental_service::annotate_damage(
        &db,
        id,
        payload.penalty_amount,
        payload.damage_report,
        payload.admin_notes,
    )
    .await
    .map_err(domain_error)?;

    Ok(Json(json!({
        "message": "Rental updated with damage/penalty info",
        "rental": updated
    })))
}

pub async fn process_refund(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult {
    claims.require_role("admin")?;

    let (updated, credited) = rental_service::process_refund(&db, id)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({
        "message": format!(
            "Successfully refunded {} to {}'s wallet",
            updated.refund_amount.as_deref().unwrap_or("0.00"),
            credited.username
        ),
        "rental": updated
    })))
}

/// Deadline reminders for the signed-in user's active rentals.
pub async fn deadlines(State(db): State<DatabaseConnection>, claims: Claims) -> ApiResult {
    claims.require_role("user")?;

    let rentals = rental_service::list_rentals(
        &db,
        rental_service::RentalFilter {
            user_id: Some(claims.uid),
            status: Some("approved".to_string()),
            ..Default::default()
        },
    )
    .await
    .map_err(domain_error)?;

    let reminders: Vec<serde_json::Value> = rentals
        .iter()
        .filter_map(|r| {
            let days_left = r.days_until_deadline?;
            (days_left <= 3).then(|| {
                json!({
                    "rental_id": r.rental.id,
                    "item_name": r.item_name,
                    "days_left": days_left,
                    "message": format!("Return deadline for {} in {} day(s)", r.item_name, days_left),
                })
            })
        })
        .collect();

    Ok(Json(json!({ "deadlines": reminders })))
}

pub async fn download_invoice(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    claims.require_role("admin")?;

    let (found, renter, rented_item) = rental_service::find_with_relations(&db, id)
        .await
        .map_err(domain_error)?;

    let document = invoice_service::render_invoice(&found, &renter, &rented_item, Utc::now())
        .map_err(domain_error)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"agrirent_invoice_{}.txt\"", id),
            ),
        ],
        document,
    ))
}

pub async fn email_invoice(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult {
    claims.require_role("admin")?;

    let (found, renter, rented_item) = rental_service::find_with_relations(state.db(), id)
        .await
        .map_err(domain_error)?;

    invoice_service::email_invoice(state.mailer.as_ref(), &found, &renter, &rented_item)
        .await
        .map_err(domain_error)?;

    Ok(Json(json!({
        "message": format!("Invoice sent successfully to {}", renter.email)
    })))
}

fn not_yours() -> ApiError {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "Access denied" })),
    )
}
