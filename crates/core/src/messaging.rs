//! Booking message threads.
//!
//! Every booking has one thread shared by its customer and provider. Messages
//! are pushed to the other participant over the WebSocket connection using
//! the channel name from [`thread_channel`].

use crate::error::CoreError;
use crate::types::DbId;

pub const MAX_MESSAGE_LEN: usize = 4_000;
pub const MAX_CLIENT_ID_LEN: usize = 64;

/// Realtime channel name for a booking's thread.
pub fn thread_channel(booking_id: DbId) -> String {
    format!("private-booking-{booking_id}")
}

/// Validate a message body. Leading/trailing whitespace is ignored.
pub fn validate_message_body(body: &str) -> Result<(), CoreError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Message must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(CoreError::Validation(format!(
            "Message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate the client-generated id used to reconcile optimistic sends.
pub fn validate_client_id(client_id: &str) -> Result<(), CoreError> {
    if client_id.is_empty() || client_id.len() > MAX_CLIENT_ID_LEN {
        return Err(CoreError::Validation(format!(
            "client_id must be 1-{MAX_CLIENT_ID_LEN} characters"
        )));
    }
    if !client_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CoreError::Validation(
            "client_id may only contain letters, digits, '-' and '_'".into(),
        ));
    }
    Ok(())
}
