//! Well-known role name constants.
//!
//! These must match the `chk_users_role` constraint in the users migration.

use crate::error::CoreError;

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_PROVIDER: &str = "PROVIDER";
pub const ROLE_CUSTOMER: &str = "CUSTOMER";

/// Roles a visitor may pick when registering. Admins are provisioned out of band.
pub const SELF_REGISTER_ROLES: &[&str] = &[ROLE_CUSTOMER, ROLE_PROVIDER];

/// Validate a role chosen at registration time.
pub fn validate_registration_role(role: &str) -> Result<(), CoreError> {
    if SELF_REGISTER_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Role must be one of: {}",
            SELF_REGISTER_ROLES.join(", ")
        )))
    }
}
