//! Identity verification.
//!
//! A user submits an ID number and document references; an admin approves or
//! rejects. The verification flag is the hard precondition for renting and
//! flips only through the admin actions here.

use chrono::Utc;
use sea_orm::*;

use crate::domain::DomainError;
use crate::models::user::{self, Entity as User};

pub async fn submit_verification(
    db: &DatabaseConnection,
    user_id: i32,
    id_number: String,
    doc_front: String,
    doc_back: String,
) -> Result<user::Model, DomainError> {
    let found = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    if found.is_verified {
        return Err(DomainError::Validation(
            "Your identity is already verified".to_string(),
        ));
    }

    // Resubmission replaces earlier documents and waits for admin review
    let mut active: user::ActiveModel = found.into();
    active.id_number = Set(Some(id_number));
    active.id_doc_front = Set(Some(doc_front));
    active.id_doc_back = Set(Some(doc_back));
    active.is_verified = Set(false);
    active.verified_at = Set(None);
    active.updated_at = Set(Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

pub async fn approve_verification(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<user::Model, DomainError> {
    let found = User::find_by_id(user_id)
        .filter(user::Column::Role.eq("user"))
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let now = Utc::now().to_rfc3339();
    let mut active: user::ActiveModel = found.into();
    active.is_verified = Set(true);
    active.verified_at = Set(Some(now.clone()));
    active.updated_at = Set(now);

    let updated = active.update(db).await?;
    tracing::info!("Identity verified for '{}'", updated.username);
    Ok(updated)
}

/// Rejection clears the submitted documents so the user can re-upload.
pub async fn reject_verification(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<user::Model, DomainError> {
    let found = User::find_by_id(user_id)
        .filter(user::Column::Role.eq("user"))
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let mut active: user::ActiveModel = found.into();
    active.id_number = Set(None);
    active.id_doc_front = Set(None);
    active.id_doc_back = Set(None);
    active.is_verified = Set(false);
    active.verified_at = Set(None);
    active.updated_at = Set(Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

/// Users whose documents await admin review.
pub async fn list_pending(db: &DatabaseConnection) -> Result<Vec<user::Model>, DomainError> {
    let pending = User::find()
        .filter(user::Column::Role.eq("user"))
        .filter(user::Column::IsVerified.eq(false))
        .filter(user::Column::IdNumber.is_not_null())
        .all(db)
        .await?;
    Ok(pending)
}
