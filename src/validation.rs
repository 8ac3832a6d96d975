// Validation utilities module
// Custom validation functions for inventory requests

use validator::ValidationError;

/// Validates that a text field is not empty after trimming
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

/// Validates that an adjustment quantity is non-zero
pub fn validate_non_zero_quantity(quantity: i32) -> Result<(), ValidationError> {
    if quantity == 0 {
        Err(ValidationError::new("quantity_must_be_non_zero"))
    } else {
        Ok(())
    }
}

/// Validates that a restock or reservation quantity is strictly positive
pub fn validate_positive_quantity(quantity: i32) -> Result<(), ValidationError> {
    if quantity <= 0 {
        Err(ValidationError::new("quantity_must_be_positive"))
    } else {
        Ok(())
    }
}
