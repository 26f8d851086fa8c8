//! Rental lifecycle - the state machine from request to refunded return.
//!
//! States: pending -> approved -> returned (-> damaged when a penalty is
//! applied); pending -> rejected is terminal. Every transition runs its guard
//! and its writes inside one transaction, so two concurrent requests cannot
//! double-approve or double-refund the same rental. Item availability and
//! wallet balances are written only here and in the catalog funnel
//! (`item_service::set_available`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::*;
use std::collections::HashMap;

use crate::domain::money::{format_amount, parse_amount, round_cents};
use crate::domain::DomainError;
use crate::models::item::{self, Entity as Item};
use crate::models::rental::{self, Entity as Rental, OPEN_STATUSES};
use crate::models::user::{self, Entity as User};

/// Rental period, in days from approval.
pub const RENTAL_PERIOD_DAYS: i64 = 7;

// ---------- pure arithmetic ----------

/// Advance deposit: 50% of the daily rate, half-up to cents.
pub fn advance_amount(price_per_day: Decimal) -> Decimal {
    round_cents(price_per_day * Decimal::new(5, 1))
}

/// Refund: 50% of the advance (25% of the daily rate); any penalty is
/// subtracted from that figure and the result is floored at zero. The penalty
/// is never compared against the full advance.
pub fn refund_for(price_per_day: Decimal, penalty: Option<Decimal>) -> Decimal {
    let base = round_cents(advance_amount(price_per_day) * Decimal::new(5, 1));
    match penalty {
        Some(p) if p > Decimal::ZERO => (base - p).max(Decimal::ZERO),
        _ => base,
    }
}

/// Whole days until the return deadline, floored at zero. Defined only for an
/// approved, paid, not-yet-returned rental with an approval stamp.
pub fn days_until_deadline(rental: &rental::Model, now: DateTime<Utc>) -> Option<i64> {
    if rental.status != "approved" || !rental.advance_paid || rental.is_returned {
        return None;
    }
    let approved_at = DateTime::parse_from_rfc3339(rental.approved_at.as_deref()?).ok()?;
    let deadline = approved_at.with_timezone(&Utc) + chrono::Duration::days(RENTAL_PERIOD_DAYS);
    Some((deadline - now).num_days().max(0))
}

// ---------- transitions ----------

/// Create a rental request. Terms are accepted at creation time; the item is
/// taken off the shelf immediately.
pub async fn create_rental(
    db: &DatabaseConnection,
    user_id: i32,
    item_id: i32,
) -> Result<rental::Model, DomainError> {
    let now = Utc::now().to_rfc3339();
    let txn = db.begin().await?;

    let renter = User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;

    if !renter.is_verified {
        return Err(DomainError::Validation(
            "Identity verification is required before renting".to_string(),
        ));
    }

    let rented_item = Item::find_by_id(item_id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;

    if !rented_item.is_available {
        return Err(DomainError::Validation(format!(
            "'{}' is currently out of stock",
            rented_item.name
        )));
    }

    let existing = Rental::find()
        .filter(rental::Column::UserId.eq(user_id))
        .filter(rental::Column::ItemId.eq(item_id))
        .filter(rental::Column::Status.is_in(OPEN_STATUSES.iter().copied()))
        .one(&txn)
        .await?;

    if let Some(open) = existing {
        return Err(DomainError::Conflict(format!(
            "You already have a {} request for '{}'",
            open.status, rented_item.name
        )));
    }

    let new_rental = rental::ActiveModel {
        user_id: Set(user_id),
        item_id: Set(item_id),
        request_date: Set(now.clone()),
        status: Set("pending".to_owned()),
        terms_accepted: Set(true),
        advance_paid: Set(false),
        is_returned: Set(false),
        refund_processed: Set(false),
        deadline_notice_sent: Set(false),
        updated_at: Set(now.clone()),
        ..Default::default()
    };
    let saved = new_rental.insert(&txn).await?;

    // Item leaves the shelf with the open request
    let mut item_active: item::ActiveModel = rented_item.into();
    item_active.is_available = Set(false);
    item_active.updated_at = Set(now);
    item_active.update(&txn).await?;

    txn.commit().await?;
    tracing::info!("Rental {} created for item {}", saved.id, item_id);
    Ok(saved)
}

/// Confirm the advance payment for the renter's own rental.
pub async fn confirm_payment(
    db: &DatabaseConnection,
    user_id: i32,
    rental_id: i32,
    payment_reference: Option<String>,
) -> Result<rental::Model, DomainError> {
    let now = Utc::now().to_rfc3339();
    let txn = db.begin().await?;

    let found = Rental::find_by_id(rental_id)
        .filter(rental::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;

    if !found.terms_accepted {
        return Err(DomainError::Validation(
            "Terms must be accepted before payment".to_string(),
        ));
    }
    if found.advance_paid {
        return Err(DomainError::Validation(
            "Payment already completed for this rental".to_string(),
        ));
    }

    let mut active: rental::ActiveModel = found.into();
    active.advance_paid = Set(true);
    active.payment_reference = Set(Some(
        payment_reference.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
    ));
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Admin approval or rejection of a pending request. Approval is refused
/// until the renter has accepted terms and paid the advance.
pub async fn set_status(
    db: &DatabaseConnection,
    rental_id: i32,
    status: &str,
) -> Result<rental::Model, DomainError> {
    if status != "approved" && status != "rejected" {
        return Err(DomainError::Validation(format!(
            "Cannot set rental status to '{}'",
            status
        )));
    }

    let now = Utc::now().to_rfc3339();
    let txn = db.begin().await?;

    let found = Rental::find_by_id(rental_id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;

    if found.status != "pending" {
        return Err(DomainError::Validation(format!(
            "Only pending requests can be {}, this one is {}",
            status, found.status
        )));
    }

    if status == "approved" && !(found.terms_accepted && found.advance_paid) {
        return Err(DomainError::Validation(
            "Cannot approve: terms not accepted or advance not paid".to_string(),
        ));
    }

    let mut active: rental::ActiveModel = found.into();
    active.status = Set(status.to_owned());
    if status == "approved" {
        active.approved_at = Set(Some(now.clone()));
    }
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// User-initiated return. Flips the item back to available and computes the
/// refund immediately; the caller runs the restock fan-out after commit.
pub async fn return_rental(
    db: &DatabaseConnection,
    user_id: i32,
    rental_id: i32,
    condition: &str,
    notes: Option<String>,
) -> Result<(rental::Model, item::Model), DomainError> {
    let now = Utc::now().to_rfc3339();
    let txn = db.begin().await?;

    let found = Rental::find_by_id(rental_id)
        .filter(rental::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;

    if found.status != "approved" {
        return Err(DomainError::Validation(
            "This rental cannot be returned".to_string(),
        ));
    }
    if found.is_returned {
        return Err(DomainError::Validation(
            "This item has already been returned".to_string(),
        ));
    }

    let rented_item = Item::find_by_id(found.item_id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;

    let price = parse_amount(&rented_item.price_per_day)?;
    let penalty = match &found.penalty_amount {
        Some(p) => Some(parse_amount(p)?),
        None => None,
    };
    let refund = refund_for(price, penalty);

    let mut active: rental::ActiveModel = found.into();
    active.is_returned = Set(true);
    active.return_date = Set(Some(now.clone()));
    active.return_condition = Set(Some(condition.to_owned()));
    active.return_notes = Set(notes);
    active.status = Set("returned".to_owned());
    active.refund_amount = Set(Some(format_amount(refund)));
    active.updated_at = Set(now.clone());
    let updated = active.update(&txn).await?;

    // Back on the shelf; restock subscribers are notified after commit
    let mut item_active: item::ActiveModel = rented_item.into();
    item_active.is_available = Set(true);
    item_active.updated_at = Set(now);
    let restocked = item_active.update(&txn).await?;

    txn.commit().await?;
    tracing::info!("Rental {} returned, item {} restocked", updated.id, restocked.id);
    Ok((updated, restocked))
}

/// Admin damage/penalty annotation. A positive penalty forces the rental into
/// the damaged state.
pub async fn annotate_damage(
    db: &DatabaseConnection,
    rental_id: i32,
    penalty_amount: Option<String>,
    damage_report: Option<String>,
    admin_notes: Option<String>,
) -> Result<rental::Model, DomainError> {
    let now = Utc::now().to_rfc3339();
    let txn = db.begin().await?;

    let found = Rental::find_by_id(rental_id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;

    let mut active: rental::ActiveModel = found.into();

    if let Some(raw) = penalty_amount {
        let penalty = parse_amount(&raw)?;
        if penalty < Decimal::ZERO {
            return Err(DomainError::Validation(
                "Penalty amount cannot be negative".to_string(),
            ));
        }
        if penalty > Decimal::ZERO {
            active.status = Set("damaged".to_owned());
        }
        active.penalty_amount = Set(Some(format_amount(penalty)));
    }
    if damage_report.is_some() {
        active.damage_report = Set(damage_report);
    }
    if admin_notes.is_some() {
        active.admin_return_notes = Set(admin_notes);
    }
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Admin refund processing. Credits the renter's wallet exactly once; the
/// refund is recomputed here so a penalty annotated after the return is
/// honored. A second call is refused as already processed.
pub async fn process_refund(
    db: &DatabaseConnection,
    rental_id: i32,
) -> Result<(rental::Model, user::Model), DomainError> {
    let now = Utc::now().to_rfc3339();
    let txn = db.begin().await?;

    let found = Rental::find_by_id(rental_id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;

    if !found.is_returned {
        return Err(DomainError::Validation(
            "Item must be returned before processing refund".to_string(),
        ));
    }
    if found.refund_processed {
        return Err(DomainError::Validation(
            "Refund already processed for this rental".to_string(),
        ));
    }

    let rented_item = Item::find_by_id(found.item_id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;
    let renter = User::find_by_id(found.user_id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;

    let price = parse_amount(&rented_item.price_per_day)?;
    let penalty = match &found.penalty_amount {
        Some(p) => Some(parse_amount(p)?),
        None => None,
    };
    let refund = refund_for(price, penalty);

    if refund <= Decimal::ZERO {
        return Err(DomainError::Validation(
            "No refund available due to penalty charges".to_string(),
        ));
    }

    let balance = parse_amount(&renter.wallet_balance)?;
    let mut user_active: user::ActiveModel = renter.into();
    user_active.wallet_balance = Set(format_amount(balance + refund));
    user_active.updated_at = Set(now.clone());
    let credited = user_active.update(&txn).await?;

    let mut active: rental::ActiveModel = found.into();
    active.refund_processed = Set(true);
    active.refund_amount = Set(Some(format_amount(refund)));
    active.refund_date = Set(Some(now.clone()));
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    tracing::info!(
        "Refund of {} credited to '{}' for rental {}",
        updated.refund_amount.as_deref().unwrap_or("0.00"),
        credited.username,
        updated.id
    );
    Ok((updated, credited))
}

// ---------- read side ----------

/// Enriched rental with renter and item names
#[derive(Debug, Clone, serde::Serialize)]
pub struct RentalWithDetails {
    #[serde(flatten)]
    pub rental: rental::Model,
    pub username: String,
    pub item_name: String,
    pub item_category: String,
    pub price_per_day: String,
    pub days_until_deadline: Option<i64>,
}

/// Filter parameters for listing rentals
#[derive(Debug, Default, Clone)]
pub struct RentalFilter {
    pub user_id: Option<i32>,
    pub item_id: Option<i32>,
    pub status: Option<String>,
}

/// List rentals with related renter and item info, newest first.
pub async fn list_rentals(
    db: &DatabaseConnection,
    filter: RentalFilter,
) -> Result<Vec<RentalWithDetails>, DomainError> {
    let mut condition = Condition::all();

    if let Some(user_id) = filter.user_id {
        condition = condition.add(rental::Column::UserId.eq(user_id));
    }
    if let Some(item_id) = filter.item_id {
        condition = condition.add(rental::Column::ItemId.eq(item_id));
    }
    if let Some(status) = filter.status {
        condition = condition.add(rental::Column::Status.eq(status));
    }

    let rentals_with_users = Rental::find()
        .filter(condition)
        .order_by_desc(rental::Column::RequestDate)
        .find_also_related(User)
        .all(db)
        .await?;

    let item_ids: Vec<i32> = rentals_with_users.iter().map(|(r, _)| r.item_id).collect();

    let mut item_map: HashMap<i32, item::Model> = HashMap::new();
    if !item_ids.is_empty() {
        let items = Item::find()
            .filter(item::Column::Id.is_in(item_ids))
            .all(db)
            .await?;
        for i in items {
            item_map.insert(i.id, i);
        }
    }

    let now = Utc::now();
    let result = rentals_with_users
        .into_iter()
        .map(|(r, u)| {
            let username = u
                .map(|u| u.username)
                .unwrap_or_else(|| "Unknown".to_string());
            let (item_name, item_category, price_per_day) = item_map
                .get(&r.item_id)
                .map(|i| (i.name.clone(), i.category.clone(), i.price_per_day.clone()))
                .unwrap_or_else(|| ("Unknown".to_string(), String::new(), String::new()));
            let days = days_until_deadline(&r, now);
            RentalWithDetails {
                rental: r,
                username,
                item_name,
                item_category,
                price_per_day,
                days_until_deadline: days,
            }
        })
        .collect();

    Ok(result)
}

/// Fetch one rental with its renter and item rows.
pub async fn find_with_relations(
    db: &DatabaseConnection,
    rental_id: i32,
) -> Result<(rental::Model, user::Model, item::Model), DomainError> {
    let found = Rental::find_by_id(rental_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;
    let renter = User::find_by_id(found.user_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;
    let rented_item = Item::find_by_id(found.item_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;
    Ok((found, renter, rented_item))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn advance_is_half_the_daily_rate() {
        assert_eq!(format_amount(advance_amount(dec("200.00"))), "100.00");
        // 33.33 * 0.5 = 16.665, half-up
        assert_eq!(format_amount(advance_amount(dec("33.33"))), "16.67");
    }

    #[test]
    fn refund_without_penalty_is_quarter_of_daily_rate() {
        assert_eq!(format_amount(refund_for(dec("200.00"), None)), "50.00");
        assert_eq!(
            format_amount(refund_for(dec("200.00"), Some(Decimal::ZERO))),
            "50.00"
        );
        // round(round(33.33*0.5)*0.5) = round(16.67*0.5) = round(8.335) = 8.34
        assert_eq!(format_amount(refund_for(dec("33.33"), None)), "8.34");
    }

    #[test]
    fn penalty_is_subtracted_and_floored_at_zero() {
        assert_eq!(
            format_amount(refund_for(dec("200.00"), Some(dec("40.00")))),
            "10.00"
        );
        assert_eq!(
            format_amount(refund_for(dec("200.00"), Some(dec("60.00")))),
            "0.00"
        );
    }

    fn approved_rental(approved_at: &str) -> rental::Model {
        rental::Model {
            id: 1,
            user_id: 1,
            item_id: 1,
            request_date: approved_at.to_string(),
            status: "approved".to_string(),
            terms_accepted: true,
            advance_paid: true,
            payment_reference: None,
            approved_at: Some(approved_at.to_string()),
            damage_report: None,
            penalty_amount: None,
            return_date: None,
            is_returned: false,
            return_condition: None,
            return_notes: None,
            admin_return_notes: None,
            refund_processed: false,
            refund_amount: None,
            refund_date: None,
            deadline_notice_sent: false,
            updated_at: approved_at.to_string(),
        }
    }

    #[test]
    fn deadline_counts_whole_days_and_floors_at_zero() {
        let rental = approved_rental("2026-01-01T12:00:00+00:00");
        // Deadline is 2026-01-08T12:00, exactly 5 whole days after Jan 3 noon
        let now = "2026-01-03T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(days_until_deadline(&rental, now), Some(5));

        // One hour past the deadline: 0, not negative
        let late = "2026-01-08T13:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(days_until_deadline(&rental, late), Some(0));
    }

    #[test]
    fn deadline_is_undefined_off_the_approved_path() {
        let now = Utc::now();

        let mut pending = approved_rental("2026-01-01T12:00:00+00:00");
        pending.status = "pending".to_string();
        assert_eq!(days_until_deadline(&pending, now), None);

        let mut unpaid = approved_rental("2026-01-01T12:00:00+00:00");
        unpaid.advance_paid = false;
        assert_eq!(days_until_deadline(&unpaid, now), None);

        let mut returned = approved_rental("2026-01-01T12:00:00+00:00");
        returned.is_returned = true;
        assert_eq!(days_until_deadline(&returned, now), None);
    }
}
