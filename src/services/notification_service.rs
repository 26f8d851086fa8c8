//! Stock-alert subscriptions and deadline reminders.
//!
//! Fan-out marks a subscription notified only when its send succeeds; one
//! failed recipient never blocks the rest and stays unsent for the next
//! restock or a manual re-run.

use chrono::Utc;
use sea_orm::*;

use crate::domain::DomainError;
use crate::mailer::Mailer;
use crate::models::item::{self, Entity as Item};
use crate::models::rental::{self, Entity as Rental};
use crate::models::stock_notification::{self, Entity as StockNotification};
use crate::models::user::{self, Entity as User};
use crate::services::rental_service;

/// Outcome of a subscribe call: created, or already on the list.
pub struct SubscribeOutcome {
    pub subscription: stock_notification::Model,
    pub created: bool,
}

/// Idempotent subscription: an existing pair is reported back, not duplicated.
pub async fn subscribe(
    db: &DatabaseConnection,
    user_id: i32,
    item_id: i32,
) -> Result<SubscribeOutcome, DomainError> {
    Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let existing = StockNotification::find()
        .filter(stock_notification::Column::UserId.eq(user_id))
        .filter(stock_notification::Column::ItemId.eq(item_id))
        .one(db)
        .await?;

    if let Some(subscription) = existing {
        return Ok(SubscribeOutcome {
            subscription,
            created: false,
        });
    }

    let new_sub = stock_notification::ActiveModel {
        user_id: Set(user_id),
        item_id: Set(item_id),
        notified: Set(false),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };
    let saved = new_sub.insert(db).await?;

    Ok(SubscribeOutcome {
        subscription: saved,
        created: true,
    })
}

/// Remove the caller's own subscription.
pub async fn unsubscribe(
    db: &DatabaseConnection,
    user_id: i32,
    subscription_id: i32,
) -> Result<(), DomainError> {
    let found = StockNotification::find_by_id(subscription_id)
        .filter(stock_notification::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    found.delete(db).await?;
    Ok(())
}

pub async fn list_subscriptions(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<(stock_notification::Model, Option<item::Model>)>, DomainError> {
    let subs = StockNotification::find()
        .filter(stock_notification::Column::UserId.eq(user_id))
        .find_also_related(Item)
        .all(db)
        .await?;
    Ok(subs)
}

/// Restock fan-out: one send attempt per unsent subscriber. Runs after the
/// availability flip has been committed.
pub async fn notify_restocked(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    restocked: &item::Model,
) -> Result<usize, DomainError> {
    let pending = StockNotification::find()
        .filter(stock_notification::Column::ItemId.eq(restocked.id))
        .filter(stock_notification::Column::Notified.eq(false))
        .find_also_related(User)
        .all(db)
        .await?;

    let mut sent = 0;
    for (subscription, subscriber) in pending {
        let Some(subscriber) = subscriber else {
            continue;
        };

        let subject = format!("{} is Back in Stock!", restocked.name);
        let body = format!(
            "Hello {},\n\nGood news! The equipment \"{}\" you were interested in \
             is now back in stock and available for rental.\n\nRent it now before \
             it gets taken!",
            subscriber.username, restocked.name
        );

        match mailer.send(&subscriber.email, &subject, &body).await {
            Ok(()) => {
                let mut active: stock_notification::ActiveModel = subscription.into();
                active.notified = Set(true);
                active.update(db).await?;
                sent += 1;
            }
            Err(e) => {
                // Left unsent so a later restock or re-run can retry it
                tracing::warn!(
                    "Failed to send restock notification to {}: {}",
                    subscriber.email,
                    e
                );
            }
        }
    }

    Ok(sent)
}

/// One reminder per active rental within three days of its return deadline.
/// The sent flag flips only on send success.
pub async fn send_deadline_reminders(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
) -> Result<usize, DomainError> {
    let active_rentals = Rental::find()
        .filter(rental::Column::Status.eq("approved"))
        .filter(rental::Column::AdvancePaid.eq(true))
        .filter(rental::Column::IsReturned.eq(false))
        .filter(rental::Column::DeadlineNoticeSent.eq(false))
        .find_also_related(User)
        .all(db)
        .await?;

    let now = Utc::now();
    let mut sent = 0;

    for (active_rental, renter) in active_rentals {
        let Some(renter) = renter else { continue };
        let Some(days_left) = rental_service::days_until_deadline(&active_rental, now) else {
            continue;
        };
        if days_left > 3 {
            continue;
        }

        let item_name = Item::find_by_id(active_rental.item_id)
            .one(db)
            .await?
            .map(|i| i.name)
            .unwrap_or_else(|| "your rented equipment".to_string());

        let subject = "Return deadline approaching".to_string();
        let body = format!(
            "Hello {},\n\nReturn deadline for {} in {} day(s).",
            renter.username, item_name, days_left
        );

        match mailer.send(&renter.email, &subject, &body).await {
            Ok(()) => {
                let mut rental_active: rental::ActiveModel = active_rental.into();
                rental_active.deadline_notice_sent = Set(true);
                rental_active.updated_at = Set(now.to_rfc3339());
                rental_active.update(db).await?;
                sent += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to send deadline reminder to {}: {}", renter.email, e);
            }
        }
    }

    Ok(sent)
}
