//! Role gate - Decides who may open the admin views.
//!
//! A user's elevated role lives in the `user_roles` table. A missing row, or a lookup
//! that fails, means "no elevated role" and never blocks the caller. Passing the gate
//! yields an [`AdminAccess`] token that every admin operation requires.

use crate::{
    core::session::AuthUser,
    entities::{AppRole, UserRoleColumn, UserRoleEntity},
    errors::{Error, Result},
};
use sea_orm::prelude::*;
use tracing::{debug, warn};

/// Looks up the role assigned to `user_id`.
///
/// Returns `None` when no role is assigned or the lookup fails.
pub async fn role_of(db: &DatabaseConnection, user_id: Uuid) -> Option<AppRole> {
    match UserRoleEntity::find()
        .filter(UserRoleColumn::UserId.eq(user_id))
        .one(db)
        .await
    {
        Ok(row) => row.map(|r| r.role),
        Err(e) => {
            warn!("Role lookup for {user_id} failed, treating as no role: {e}");
            None
        }
    }
}

/// Proof that the holder passed the admin gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminAccess {
    user_id: Uuid,
}

impl AdminAccess {
    /// The admin who opened the view.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.user_id
    }
}

/// Outcome of checking the gate for a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Render the admin view
    Allow(AdminAccess),
    /// No session, go to the login flow
    RedirectToLogin,
    /// Signed in without the admin role, go back to the dashboard
    RedirectToDashboard,
}

impl GateDecision {
    /// Converts a redirect into the matching error.
    pub fn into_access(self) -> Result<AdminAccess> {
        match self {
            Self::Allow(access) => Ok(access),
            Self::RedirectToLogin => Err(Error::Auth),
            Self::RedirectToDashboard => Err(Error::AccessDenied {
                message: "Admin only".to_string(),
            }),
        }
    }
}

/// Checks whether the session may open an admin view. Run once per view mount.
pub async fn check_admin(db: &DatabaseConnection, session: Option<&AuthUser>) -> GateDecision {
    let Some(user) = session else {
        return GateDecision::RedirectToLogin;
    };

    match role_of(db, user.id).await {
        Some(AppRole::Admin) => {
            debug!("Admin gate passed for {}", user.id);
            GateDecision::Allow(AdminAccess { user_id: user.id })
        }
        role => {
            debug!("Admin gate refused {} with role {role:?}", user.id);
            GateDecision::RedirectToDashboard
        }
    }
}
