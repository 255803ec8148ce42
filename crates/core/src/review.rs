//! Review rating rules and provider rating aggregation.

use crate::error::CoreError;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;
pub const MAX_COMMENT_LEN: usize = 2_000;

/// Validate a star rating.
pub fn validate_rating(rating: i16) -> Result<(), CoreError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )))
    }
}

/// Validate an optional free-text comment.
pub fn validate_comment(comment: Option<&str>) -> Result<(), CoreError> {
    if let Some(c) = comment {
        if c.chars().count() > MAX_COMMENT_LEN {
            return Err(CoreError::Validation(format!(
                "Comment must be at most {MAX_COMMENT_LEN} characters"
            )));
        }
    }
    Ok(())
}

/// Fold one more rating into a running average.
///
/// Returns the new `(average, count)` at full precision. Store this value
/// and round with [`display_rating`] only when showing it; feeding a
/// rounded average back in drifts away from the true mean.
pub fn updated_average(old_avg: f64, old_count: i32, new_rating: i16) -> (f64, i32) {
    let count = old_count.max(0) + 1;
    let total = old_avg * old_count.max(0) as f64 + new_rating as f64;
    (total / count as f64, count)
}

/// Round an average to two decimals for display.
pub fn display_rating(avg: f64) -> f64 {
    (avg * 100.0).round() / 100.0
}
