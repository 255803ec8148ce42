//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`]: the caller, from a JWT Bearer token.
//! - [`rbac::RequireAdmin`], [`rbac::RequireProvider`],
//!   [`rbac::RequireCustomer`]: reject other roles with 403.
//! - [`rbac::RequireAuth`]: any authenticated user.

pub mod auth;
pub mod rbac;
