//! Profile entity - One row per signed-up user.
//!
//! The `id` is the identity issued by the auth provider. Rows are created on signup
//! and the `wallet_balance` is credited by settlement processes outside this crate.

use super::enums::UserRole;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Profile database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Identity id from the auth provider
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Contact phone number
    pub phone: String,
    /// Optional email address
    pub email: Option<String>,
    /// Optional saved address
    pub address: Option<String>,
    /// Account role
    pub role: UserRole,
    /// Non-negative wallet balance in rupees
    pub wallet_balance: f64,
    /// When the profile was created
    pub created_at: DateTimeUtc,
    /// When the profile was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Profile and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One profile has many bookings
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
    /// One profile has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
