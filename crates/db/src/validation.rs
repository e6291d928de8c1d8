//! Rules used by `#[validate(custom(...))]` on the request types.

use validator::ValidationError;

/// Hours must be a finite number, zero or above. `range` lets NaN through.
pub fn non_negative_hours(hours: f64) -> Result<(), ValidationError> {
    if hours.is_finite() && hours >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new("non_negative"))
    }
}
