//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` input DTOs for inserts and updates
//!
//! Status columns are stored as TEXT and exposed as `String`; the typed view
//! comes from the `status()` accessors, which parse through
//! `servicematch_core::status`.

pub mod ai;
pub mod booking;
pub mod dashboard;
pub mod dispute;
pub mod ledger;
pub mod message;
pub mod notification;
pub mod profile;
pub mod quote;
pub mod quote_request;
pub mod review;
pub mod session;
pub mod user;

/// Serde helpers that round stored rating averages for output.
pub(crate) mod rating {
    use serde::Serializer;
    use servicematch_core::review::display_rating;

    pub fn serialize<S: Serializer>(avg: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(display_rating(*avg))
    }

    pub fn serialize_opt<S: Serializer>(
        avg: &Option<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match avg {
            Some(avg) => serializer.serialize_some(&display_rating(*avg)),
            None => serializer.serialize_none(),
        }
    }
}
