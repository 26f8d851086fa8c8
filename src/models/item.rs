use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Equipment categories offered for rental.
pub const CATEGORIES: &[&str] = &[
    "Lawn & Gardening",
    "Hand Tools",
    "Earth Auger",
    "Ploughs",
    "Seeders",
    "Sprayers",
    "Fertilizers",
];

/// Days an item counts as "new" after being added.
pub const NEW_ITEM_WINDOW_DAYS: i64 = 7;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub category: String,
    pub description: String,
    // Two-decimal TEXT, > 0
    pub price_per_day: String,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub added_by: i32,
    pub is_new: bool,
    pub new_until: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AddedBy",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(has_many = "super::rental::Entity")]
    Rentals,
    #[sea_orm(has_many = "super::stock_notification::Entity")]
    StockNotifications,
}

impl Related<super::rental::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rentals.def()
    }
}

impl Related<super::stock_notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockNotifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Create/update payload. Availability is deliberately absent; that flag is
/// owned by the rental lifecycle and the availability endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemDto {
    pub name: String,
    pub category: String,
    pub description: String,
    pub price_per_day: String,
    pub image_url: Option<String>,
}
