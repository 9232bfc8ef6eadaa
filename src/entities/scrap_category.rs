//! Scrap category entity - Recyclable material kinds (paper, metal, e-waste...).
//! Seeded externally or from `config.toml`; read-only for the booking flow.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Scrap category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scrap_categories")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Display name (e.g. "Paper")
    #[sea_orm(unique)]
    pub name: String,
    /// Unit of measure, usually "kg"
    pub unit: String,
    /// Optional icon name
    pub icon: Option<String>,
    /// Optional description
    pub description: Option<String>,
    /// Creation time, defines catalog order
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ScrapCategory` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One category has many bookings
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
    /// One category has many market rate readings
    #[sea_orm(has_many = "super::market_rate::Entity")]
    MarketRates,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl Related<super::market_rate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MarketRates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
