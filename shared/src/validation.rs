//! Validation utilities for the PropMaster platform

use rust_decimal::Decimal;
use validator::{ValidationError, ValidationErrors};

// ============================================================================
// Field validators (used through `#[validate(custom = ...)]`)
// ============================================================================

/// Prices may be zero (unlisted) but never negative
pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Value cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Payment amounts must be strictly positive
pub fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut err = ValidationError::new("positive");
        err.message = Some("Amount must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate that a date range is ordered
pub fn validate_date_order(
    start: Option<chrono::NaiveDate>,
    end: Option<chrono::NaiveDate>,
) -> Result<(), &'static str> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err("Start date must not be after end date"),
        _ => Ok(()),
    }
}

/// Validate a price range filter
pub fn validate_price_range(
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> Result<(), &'static str> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err("Minimum price must not exceed maximum price"),
        _ => Ok(()),
    }
}

/// First failing field and its message, for single-error API responses.
/// Fields are visited in name order so the answer is deterministic.
pub fn first_violation(errors: &ValidationErrors) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    fields.into_iter().find_map(|(field, errs)| {
        errs.first().map(|err| {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for {}", field));
            (field.to_string(), message)
        })
    })
}
