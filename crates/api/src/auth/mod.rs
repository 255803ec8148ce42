//! Authentication primitives.
//!
//! - [`password`]: Argon2id password hashing and strength checks.
//! - [`jwt`]: access-token issue/validation and refresh-token helpers.

pub mod jwt;
pub mod password;
