//! Entity module - Contains all SeaORM entity definitions for the portal's tables.
//! Each entity has a Model struct for data and an Entity struct for operations.
//! String-backed enums shared by several tables live in [`enums`].

pub mod booking;
pub mod collector;
pub mod enums;
pub mod market_rate;
pub mod profile;
pub mod scrap_category;
pub mod transaction;
pub mod user_role;

// Re-export specific types to avoid conflicts
pub use booking::{Column as BookingColumn, Entity as Booking, Model as BookingModel};
pub use collector::{Column as CollectorColumn, Entity as Collector, Model as CollectorModel};
pub use enums::{AppRole, BookingStatus, PaymentMethod, UserRole};
pub use market_rate::{
    Column as MarketRateColumn, Entity as MarketRate, Model as MarketRateModel,
};
pub use profile::{Column as ProfileColumn, Entity as Profile, Model as ProfileModel};
pub use scrap_category::{
    Column as ScrapCategoryColumn, Entity as ScrapCategory, Model as ScrapCategoryModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use user_role::{Column as UserRoleColumn, Entity as UserRoleEntity, Model as UserRoleModel};
