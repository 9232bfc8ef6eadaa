//! String-backed enums stored in text columns.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role recorded on a user's profile
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular customer
    #[default]
    #[sea_orm(string_value = "user")]
    User,
    /// Platform administrator
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Pickup collector
    #[sea_orm(string_value = "collector")]
    Collector,
}

/// Access tier from the role-assignment table, gating administrative views
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum AppRole {
    /// Full administrative access
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Moderation access, no admin views
    #[sea_orm(string_value = "moderator")]
    Moderator,
    /// No elevated access
    #[sea_orm(string_value = "user")]
    User,
}

/// Lifecycle of a pickup booking
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Newly created, waiting for a collector
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    /// A collector has been assigned
    #[sea_orm(string_value = "assigned")]
    Assigned,
    /// Pickup done and settled
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Cancelled by the user or operations
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// How a settlement was paid out
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// UPI transfer
    #[sea_orm(string_value = "upi")]
    Upi,
    /// Cash on pickup
    #[sea_orm(string_value = "cash")]
    Cash,
    /// Credited to the in-app wallet
    #[sea_orm(string_value = "wallet")]
    Wallet,
}
