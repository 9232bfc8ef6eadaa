//! Booking entity - A user's request for a scrap pickup.
//!
//! Created with status `pending` by the booking writer. `actual_weight`,
//! `final_amount` and `collector_id` are filled in later by collector-side
//! processes.

use super::enums::BookingStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Booking database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning user (profile id)
    pub user_id: Uuid,
    /// Category of scrap being picked up
    pub category_id: Uuid,
    /// Estimated weight in kg, always positive
    pub estimated_weight: f64,
    /// Weighed amount recorded at pickup
    pub actual_weight: Option<f64>,
    /// Settled payout
    pub final_amount: Option<f64>,
    /// Free-text pickup address
    pub pickup_address: String,
    /// Requested pickup instant
    pub pickup_time: DateTimeUtc,
    /// Optional instructions
    pub notes: Option<String>,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// Collector assigned to the pickup
    pub collector_id: Option<Uuid>,
    /// When the booking was created
    pub created_at: DateTimeUtc,
    /// When the booking was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Booking and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each booking belongs to one profile
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::UserId",
        to = "super::profile::Column::Id"
    )]
    Profile,
    /// Each booking is for one category
    #[sea_orm(
        belongs_to = "super::scrap_category::Entity",
        from = "Column::CategoryId",
        to = "super::scrap_category::Column::Id"
    )]
    ScrapCategory,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::scrap_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScrapCategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
