//! Inventory catalog.
//!
//! `set_available` is the single funnel for availability writes outside the
//! rental lifecycle; callers that flip an item back in stock run the restock
//! fan-out afterwards.

use chrono::{DateTime, Utc};
use sea_orm::*;

use crate::domain::money::parse_amount;
use crate::domain::DomainError;
use crate::models::item::{self, Entity as Item, ItemDto, CATEGORIES, NEW_ITEM_WINDOW_DAYS};
use crate::models::rental::{self, Entity as Rental};

/// True while the item is inside its "new arrival" window.
pub fn is_new(model: &item::Model, now: DateTime<Utc>) -> bool {
    if !model.is_new {
        return false;
    }
    model
        .new_until
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|until| now < until.with_timezone(&Utc))
        .unwrap_or(false)
}

pub async fn create_item(
    db: &DatabaseConnection,
    admin_id: i32,
    dto: ItemDto,
) -> Result<item::Model, DomainError> {
    if !CATEGORIES.contains(&dto.category.as_str()) {
        return Err(DomainError::Validation(format!(
            "Unknown category '{}'",
            dto.category
        )));
    }
    parse_amount(&dto.price_per_day)?;

    let now = Utc::now();
    let new_until = now + chrono::Duration::days(NEW_ITEM_WINDOW_DAYS);

    let new_item = item::ActiveModel {
        name: Set(dto.name),
        category: Set(dto.category),
        description: Set(dto.description),
        price_per_day: Set(dto.price_per_day),
        image_url: Set(dto.image_url),
        is_available: Set(true),
        added_by: Set(admin_id),
        is_new: Set(true),
        new_until: Set(Some(new_until.to_rfc3339())),
        created_at: Set(now.to_rfc3339()),
        updated_at: Set(now.to_rfc3339()),
        ..Default::default()
    };

    Ok(new_item.insert(db).await?)
}

pub async fn update_item(
    db: &DatabaseConnection,
    item_id: i32,
    dto: ItemDto,
) -> Result<item::Model, DomainError> {
    let found = Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    if !CATEGORIES.contains(&dto.category.as_str()) {
        return Err(DomainError::Validation(format!(
            "Unknown category '{}'",
            dto.category
        )));
    }
    parse_amount(&dto.price_per_day)?;

    // Availability is not editable here; the lifecycle and the
    // availability funnel own that flag.
    let mut active: item::ActiveModel = found.into();
    active.name = Set(dto.name);
    active.category = Set(dto.category);
    active.description = Set(dto.description);
    active.price_per_day = Set(dto.price_per_day);
    active.image_url = Set(dto.image_url);
    active.updated_at = Set(Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

/// Delete an item. Refused while any rental references it, whatever its
/// status - rental history is never orphaned.
pub async fn delete_item(db: &DatabaseConnection, item_id: i32) -> Result<(), DomainError> {
    let found = Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let rental_count = Rental::find()
        .filter(rental::Column::ItemId.eq(item_id))
        .count(db)
        .await?;

    if rental_count > 0 {
        return Err(DomainError::Conflict(format!(
            "Cannot delete '{}' because it has rental requests. Mark it as unavailable instead.",
            found.name
        )));
    }

    found.delete(db).await?;
    Ok(())
}

/// Availability funnel. Returns the updated item and whether this call was a
/// restock (false -> true), in which case the caller runs the notification
/// fan-out.
pub async fn set_available(
    db: &DatabaseConnection,
    item_id: i32,
    available: bool,
) -> Result<(item::Model, bool), DomainError> {
    let found = Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let restocked = !found.is_available && available;

    let mut active: item::ActiveModel = found.into();
    active.is_available = Set(available);
    active.updated_at = Set(Utc::now().to_rfc3339());
    let updated = active.update(db).await?;

    Ok((updated, restocked))
}

/// Filter parameters for the catalog listing
#[derive(Debug, Default, Clone)]
pub struct ItemFilter {
    pub available: Option<bool>,
    pub category: Option<String>,
    pub new_only: bool,
}

pub async fn list_items(
    db: &DatabaseConnection,
    filter: ItemFilter,
) -> Result<Vec<item::Model>, DomainError> {
    let mut condition = Condition::all();

    if let Some(available) = filter.available {
        condition = condition.add(item::Column::IsAvailable.eq(available));
    }
    if let Some(category) = filter.category {
        condition = condition.add(item::Column::Category.eq(category));
    }

    let mut found = Item::find()
        .filter(condition)
        .order_by_desc(item::Column::CreatedAt)
        .all(db)
        .await?;

    if filter.new_only {
        let now = Utc::now();
        found.retain(|i| is_new(i, now));
    }

    Ok(found)
}
