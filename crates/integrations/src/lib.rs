//! Clients for the third-party services ServiceMatch depends on.
//!
//! - [`stripe`]: hosted checkout, Connect onboarding, transfers, refunds and
//!   webhook signature verification.
//! - [`payments`]: the [`PaymentGateway`] trait the API programs against.
//! - [`openai`]: chat-completions client used by FairPrice and SnapFix.

pub mod openai;
pub mod payments;
pub mod stripe;

pub use openai::{DiagnosisPrompt, OpenAiClient, OpenAiConfig, OpenAiError, PricePrompt};
pub use payments::{CheckoutRequest, CheckoutSession, PaymentGateway, TransferRequest};
pub use stripe::{StripeClient, StripeConfig, StripeError};
