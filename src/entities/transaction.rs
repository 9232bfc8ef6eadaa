//! Transaction entity - Payouts credited to users after a settled pickup.
//!
//! Each transaction has a `user_id`, an optional `booking_id`, the amount paid,
//! the payment method, a free-form status and an optional external reference.
//! Rows are written by settlement processes; this crate only reads them.
use super::enums::PaymentMethod;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Profile that received the payout
    pub user_id: Uuid,
    /// Booking that was settled, if any
    pub booking_id: Option<Uuid>,
    /// Amount paid out
    pub amount: f64,
    /// Payment channel
    pub method: PaymentMethod,
    /// Provider status string (e.g. `"completed"`)
    pub status: String,
    /// External payment reference
    pub transaction_reference: Option<String>,
    /// When the transaction was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one profile
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::UserId",
        to = "super::profile::Column::Id"
    )]
    Profile,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
