use chrono::Utc;
use sea_orm::*;

use crate::auth::hash_password;
use crate::models::{item, user};

/// Demo data for local development: one admin, one verified renter and a few
/// catalog items.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = Utc::now();

    let admin_password = hash_password("admin").map_err(DbErr::Custom)?;

    let admin = user::ActiveModel {
        username: Set("admin".to_owned()),
        email: Set("admin@agrirent.local".to_owned()),
        role: Set("admin".to_owned()),
        status: Set("approved".to_owned()),
        password_hash: Set(Some(admin_password)),
        is_verified: Set(true),
        wallet_balance: Set("0.00".to_owned()),
        created_at: Set(now.to_rfc3339()),
        updated_at: Set(now.to_rfc3339()),
        ..Default::default()
    };

    let renter = user::ActiveModel {
        username: Set("demo".to_owned()),
        email: Set("demo@agrirent.local".to_owned()),
        role: Set("user".to_owned()),
        status: Set("approved".to_owned()),
        is_verified: Set(true),
        verified_at: Set(Some(now.to_rfc3339())),
        wallet_balance: Set("0.00".to_owned()),
        created_at: Set(now.to_rfc3339()),
        updated_at: Set(now.to_rfc3339()),
        ..Default::default()
    };

    user::Entity::insert(admin)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Username)
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await?;

    user::Entity::insert(renter)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Username)
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await?;

    if item::Entity::find().count(db).await? > 0 {
        return Ok(());
    }

    let admin_id = user::Entity::find()
        .filter(user::Column::Username.eq("admin"))
        .one(db)
        .await?
        .map(|u| u.id)
        .unwrap_or(1);

    let demo_items = [
        ("Power Tiller", "Ploughs", "Heavy-duty tiller for field preparation", "200.00"),
        ("Earth Auger 52cc", "Earth Auger", "Post-hole digger with two bits", "150.00"),
        ("Knapsack Sprayer", "Sprayers", "16L manual sprayer", "40.00"),
        ("Seed Drill", "Seeders", "Walk-behind precision seeder", "120.00"),
    ];

    let new_until = (now + chrono::Duration::days(item::NEW_ITEM_WINDOW_DAYS)).to_rfc3339();
    for (name, category, description, price) in demo_items {
        let demo_item = item::ActiveModel {
            name: Set(name.to_owned()),
            category: Set(category.to_owned()),
            description: Set(description.to_owned()),
            price_per_day: Set(price.to_owned()),
            is_available: Set(true),
            added_by: Set(admin_id),
            is_new: Set(true),
            new_until: Set(Some(new_until.clone())),
            created_at: Set(now.to_rfc3339()),
            updated_at: Set(now.to_rfc3339()),
            ..Default::default()
        };
        item::Entity::insert(demo_item).exec(db).await?;
    }

    Ok(())
}
