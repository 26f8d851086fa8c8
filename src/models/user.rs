use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: String, // 'user', 'admin'
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: String, // 'pending', 'approved', 'rejected'
    // Admin accounts authenticate with a password; user accounts are OTP-only
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    // Identity verification
    pub id_number: Option<String>,
    pub id_doc_front: Option<String>,
    pub id_doc_back: Option<String>,
    pub is_verified: bool,
    pub verified_at: Option<String>,
    // Refund credits land here, two-decimal TEXT
    pub wallet_balance: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
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

/// Account data safe to return to the account holder
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: String,
    pub is_verified: bool,
    pub wallet_balance: String,
}

impl From<Model> for AccountDto {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role: model.role,
            phone: model.phone,
            address: model.address,
            status: model.status,
            is_verified: model.is_verified,
            wallet_balance: model.wallet_balance,
        }
    }
}
