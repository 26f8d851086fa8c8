use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rentals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub item_id: i32,
    pub request_date: String,
    pub status: String, // 'pending', 'approved', 'rejected', 'returned', 'damaged'
    pub terms_accepted: bool,
    pub advance_paid: bool,
    pub payment_reference: Option<String>,
    // Stamped on approval; the 7-day return deadline counts from here
    pub approved_at: Option<String>,
    pub damage_report: Option<String>,
    pub penalty_amount: Option<String>,
    pub return_date: Option<String>,
    pub is_returned: bool,
    pub return_condition: Option<String>, // 'excellent', 'good', 'damaged'
    pub return_notes: Option<String>,
    pub admin_return_notes: Option<String>,
    pub refund_processed: bool,
    pub refund_amount: Option<String>,
    pub refund_date: Option<String>,
    pub deadline_notice_sent: bool,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Item,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A rental whose status still blocks the item: not yet rejected or returned.
pub const OPEN_STATUSES: &[&str] = &["pending", "approved"];
