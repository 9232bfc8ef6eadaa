//! Collector entity - Field staff who perform pickups.
//! Only counted by the admin statistics in this crate.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Collector database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "collectors")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Identity of the collector
    pub user_id: Uuid,
    /// Display name
    pub name: String,
    /// Contact phone number
    pub phone: String,
    /// Comma-separated list of served areas
    pub service_areas: String,
    /// Lifetime earnings
    pub earnings: f64,
    /// When the collector was onboarded
    pub created_at: DateTimeUtc,
}

/// `Collector` has no relationships used by this crate
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
