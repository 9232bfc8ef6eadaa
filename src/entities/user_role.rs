//! Role assignment entity - At most one elevated role per user.

use super::enums::AppRole;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role assignment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_roles")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// User the role is assigned to
    #[sea_orm(unique)]
    pub user_id: Uuid,
    /// Assigned role
    pub role: AppRole,
    /// When the role was assigned
    pub created_at: DateTimeUtc,
}

/// Role assignments reference identities, not profiles
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
