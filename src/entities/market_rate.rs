//! Market rate entity - Price per kg offered for a category at a location on a date.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Market rate database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "market_rates")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Category this reading prices
    pub category_id: Uuid,
    /// City or area name (e.g. "Mumbai")
    pub location: String,
    /// Day of the reading
    pub date: Date,
    /// Price per kg in rupees
    pub price_per_kg: f64,
    /// When the reading was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `MarketRate` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each reading belongs to one category
    #[sea_orm(
        belongs_to = "super::scrap_category::Entity",
        from = "Column::CategoryId",
        to = "super::scrap_category::Column::Id"
    )]
    ScrapCategory,
}

impl Related<super::scrap_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScrapCategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
