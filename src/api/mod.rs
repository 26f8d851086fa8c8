pub mod analytics;
pub mod auth;
pub mod health;
pub mod items;
pub mod notifications;
pub mod rentals;
pub mod users;
pub mod verification;
pub mod wallet;

use axum::{
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::domain::DomainError;
use crate::state::AppState;

pub(crate) type ApiError = (StatusCode, Json<Value>);
pub(crate) type ApiResult = Result<Json<Value>, ApiError>;

/// Map a domain failure onto the wire: guard violations are 400 with the
/// reason, conflicts 409, missing rows 404, side-effect failures 502.
pub(crate) fn domain_error(e: DomainError) -> ApiError {
    let status = match &e {
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::External(_) => StatusCode::BAD_GATEWAY,
        DomainError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() })))
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/signup", post(auth::signup))
        .route("/auth/otp/request", post(auth::request_otp))
        .route("/auth/otp/verify", post(auth::verify_otp))
        .route("/auth/admin/login", post(auth::admin_login))
        .route("/auth/me", get(auth::get_me))
        // Catalog
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/:id",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route("/items/:id/availability", put(items::set_availability))
        .route("/items/:id/notify", post(notifications::subscribe))
        // Verification
        .route("/verification", post(verification::submit))
        .route("/verification/pending", get(verification::list_pending))
        .route("/verification/:user_id/approve", put(verification::approve))
        .route("/verification/:user_id/reject", put(verification::reject))
        // Rental lifecycle
        .route(
            "/rentals",
            get(rentals::list_rentals).post(rentals::create_rental),
        )
        .route("/rentals/deadlines", get(rentals::deadlines))
        .route("/rentals/:id", get(rentals::get_rental))
        .route(
            "/rentals/:id/payment",
            get(rentals::payment_info).post(rentals::confirm_payment),
        )
        .route("/rentals/:id/status", put(rentals::set_status))
        .route("/rentals/:id/return", put(rentals::return_rental))
        .route("/rentals/:id/damage", put(rentals::update_damage))
        .route("/rentals/:id/refund", post(rentals::process_refund))
        .route("/rentals/:id/invoice", get(rentals::download_invoice))
        .route("/rentals/:id/invoice/email", post(rentals::email_invoice))
        // Stock notifications
        .route("/notifications", get(notifications::list_subscriptions))
        .route("/notifications/:id", delete(notifications::unsubscribe))
        .route(
            "/notifications/deadline-reminders",
            post(notifications::send_deadline_reminders),
        )
        // Wallet
        .route("/wallet", get(wallet::get_wallet))
        // Admin
        .route("/users", get(users::list_users))
        .route("/users/:id/status", put(users::change_status))
        .route("/analytics", get(analytics::get_analytics))
        .with_state(state)
}
