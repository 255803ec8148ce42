//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Methods that enforce ownership or
//! status rules run inside a transaction and return [`crate::RepoError`].

pub mod admin_repo;
pub mod ai_repo;
pub mod analytics_repo;
pub mod booking_repo;
pub mod customer_profile_repo;
pub mod dispute_repo;
pub mod ledger_repo;
pub mod message_repo;
pub mod notification_repo;
pub mod provider_profile_repo;
pub mod quote_repo;
pub mod quote_request_repo;
pub mod review_repo;
pub mod session_repo;
pub mod user_repo;

pub use admin_repo::AdminRepo;
pub use ai_repo::{DiagnosisRepo, PriceCheckRepo};
pub use analytics_repo::AnalyticsRepo;
pub use booking_repo::BookingRepo;
pub use customer_profile_repo::CustomerProfileRepo;
pub use dispute_repo::DisputeRepo;
pub use ledger_repo::LedgerRepo;
pub use message_repo::MessageRepo;
pub use notification_repo::NotificationRepo;
pub use provider_profile_repo::ProviderProfileRepo;
pub use quote_repo::QuoteRepo;
pub use quote_request_repo::QuoteRequestRepo;
pub use review_repo::ReviewRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
