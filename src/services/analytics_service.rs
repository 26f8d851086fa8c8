//! Aggregate analytics - pure read-side projections over accounts, items and
//! rentals, recomputed on every call.

use rust_decimal::Decimal;
use sea_orm::*;
use std::collections::BTreeMap;

use crate::domain::money::{format_amount, parse_amount};
use crate::domain::DomainError;
use crate::models::item::{self, Entity as Item};
use crate::models::rental::{self, Entity as Rental};
use crate::models::user::{self, Entity as User};
use crate::services::rental_service::advance_amount;

#[derive(Debug, serde::Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub item_count: usize,
    pub rental_count: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct Analytics {
    pub total_users: usize,
    pub total_items: usize,
    pub total_rentals: usize,
    /// Sum of advances over paid rentals
    pub total_revenue: String,
    pub pending_payments: usize,
    pub user_status: BTreeMap<String, usize>,
    pub item_availability: BTreeMap<String, usize>,
    pub rental_status: BTreeMap<String, usize>,
    pub revenue_by_status: BTreeMap<String, String>,
    pub category_stats: Vec<CategoryStats>,
    pub recent_rentals: Vec<serde_json::Value>,
}

pub async fn aggregate_analytics(db: &DatabaseConnection) -> Result<Analytics, DomainError> {
    let users = User::find()
        .filter(user::Column::Role.eq("user"))
        .all(db)
        .await?;
    let items = Item::find().all(db).await?;
    let rentals = Rental::find()
        .order_by_desc(rental::Column::RequestDate)
        .all(db)
        .await?;

    let price_of: BTreeMap<i32, &str> = items
        .iter()
        .map(|i| (i.id, i.price_per_day.as_str()))
        .collect();

    let mut user_status: BTreeMap<String, usize> = BTreeMap::new();
    for u in &users {
        *user_status.entry(u.status.clone()).or_default() += 1;
    }

    let mut item_availability: BTreeMap<String, usize> = BTreeMap::new();
    for i in &items {
        let key = if i.is_available { "available" } else { "unavailable" };
        *item_availability.entry(key.to_string()).or_default() += 1;
    }

    let mut rental_status: BTreeMap<String, usize> = BTreeMap::new();
    let mut revenue_by_status: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut total_revenue = Decimal::ZERO;
    let mut pending_payments = 0;

    for r in &rentals {
        *rental_status.entry(r.status.clone()).or_default() += 1;

        if r.terms_accepted && !r.advance_paid {
            pending_payments += 1;
        }
        if r.advance_paid {
            if let Some(price) = price_of.get(&r.item_id) {
                let advance = advance_amount(parse_amount(price)?);
                total_revenue += advance;
                *revenue_by_status.entry(r.status.clone()).or_default() += advance;
            }
        }
    }

    let mut category_stats: BTreeMap<String, CategoryStats> = BTreeMap::new();
    for i in &items {
        let entry = category_stats
            .entry(i.category.clone())
            .or_insert_with(|| CategoryStats {
                category: i.category.clone(),
                item_count: 0,
                rental_count: 0,
            });
        entry.item_count += 1;
    }
    let category_of: BTreeMap<i32, &str> = items
        .iter()
        .map(|i| (i.id, i.category.as_str()))
        .collect();
    for r in &rentals {
        if let Some(category) = category_of.get(&r.item_id) {
            if let Some(entry) = category_stats.get_mut(*category) {
                entry.rental_count += 1;
            }
        }
    }

    let recent_rentals = rentals
        .iter()
        .take(10)
        .map(|r| {
            serde_json::json!({
                "id": r.id,
                "user_id": r.user_id,
                "item_id": r.item_id,
                "status": r.status,
                "request_date": r.request_date,
            })
        })
        .collect();

    Ok(Analytics {
        total_users: users.len(),
        total_items: items.len(),
        total_rentals: rentals.len(),
        total_revenue: format_amount(total_revenue),
        pending_payments,
        user_status,
        item_availability,
        rental_status,
        revenue_by_status: revenue_by_status
            .into_iter()
            .map(|(k, v)| (k, format_amount(v)))
            .collect(),
        category_stats: category_stats.into_values().collect(),
        recent_rentals,
    })
}
