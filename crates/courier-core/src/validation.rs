//! # Validation Module
//!
//! Input validation for request payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (axum Json extractor)                                   │
//! │  └── Shape and type checks (deserialization, enum membership)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Ranges, lengths, formats                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (coupon code, referee, invoice number)         │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::DiscountType;
use crate::{MAX_ETA_MINUTES, MAX_REVIEW_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Required, trimmed, at most `max` characters.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(value.to_string())
}

/// Optional free text: blank becomes `None`.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => validate_text(field, v, max).map(Some),
        None => Ok(None),
    }
}

pub fn validate_review(review: Option<&str>) -> ValidationResult<Option<String>> {
    validate_optional_text("review", review, MAX_REVIEW_LEN)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Top-up amounts must be positive and at most `max`.
///
/// ## Example
/// ```rust
/// use courier_core::money::Money;
/// use courier_core::validation::validate_top_up;
///
/// let max = Money::from_cents(100_000);
/// assert!(validate_top_up(Money::from_cents(5_000), max).is_ok());
/// assert!(validate_top_up(Money::zero(), max).is_err());
/// assert!(validate_top_up(Money::from_cents(100_001), max).is_err());
/// ```
pub fn validate_top_up(amount: Money, max: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    if amount > max {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: max.cents(),
        });
    }
    Ok(())
}

/// Tips are optional; when given they must not be negative.
pub fn validate_tip(tip: Money) -> ValidationResult<()> {
    if tip.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "tipAmount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Percentage coupons are capped at 100% (10000 bps).
pub fn validate_discount_value(kind: DiscountType, value: i64) -> ValidationResult<()> {
    let max = match kind {
        DiscountType::Percentage => 10_000,
        DiscountType::Flat => i64::MAX,
    };
    if !(0..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: "discountValue".to_string(),
            min: 0,
            max,
        });
    }
    Ok(())
}

pub fn validate_distance_meters(meters: i64) -> ValidationResult<()> {
    if meters < 0 {
        return Err(ValidationError::OutOfRange {
            field: "distanceMeters".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

pub fn validate_duration_minutes(minutes: i64) -> ValidationResult<()> {
    if minutes < 0 {
        return Err(ValidationError::OutOfRange {
            field: "durationMinutes".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

pub fn validate_eta_minutes(minutes: i64) -> ValidationResult<()> {
    if !(0..=MAX_ETA_MINUTES).contains(&minutes) {
        return Err(ValidationError::OutOfRange {
            field: "eta".to_string(),
            min: 0,
            max: MAX_ETA_MINUTES,
        });
    }
    Ok(())
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> ValidationResult<()> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::InvalidFormat {
            field: "coordinates".to_string(),
            reason: "latitude must be within ±90 and longitude within ±180".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text() {
        assert_eq!(validate_text("line1", "  12 Jalan Ampang ", 200).unwrap(), "12 Jalan Ampang");
        assert!(validate_text("line1", "   ", 200).is_err());
        assert!(validate_text("line1", &"A".repeat(201), 200).is_err());
    }

    #[test]
    fn test_validate_optional_text() {
        assert_eq!(validate_optional_text("reason", Some("  "), 10).unwrap(), None);
        assert_eq!(validate_optional_text("reason", None, 10).unwrap(), None);
        assert_eq!(
            validate_optional_text("reason", Some("late"), 10).unwrap(),
            Some("late".to_string())
        );
    }

    #[test]
    fn test_validate_review_length() {
        assert!(validate_review(Some(&"x".repeat(MAX_REVIEW_LEN))).is_ok());
        assert!(validate_review(Some(&"x".repeat(MAX_REVIEW_LEN + 1))).is_err());
    }

    #[test]
    fn test_validate_discount_value() {
        assert!(validate_discount_value(DiscountType::Percentage, 10_000).is_ok());
        assert!(matches!(
            validate_discount_value(DiscountType::Percentage, 10_001),
            Err(ValidationError::OutOfRange { max: 10_000, .. })
        ));
        assert!(validate_discount_value(DiscountType::Flat, 50_000).is_ok());
        assert!(validate_discount_value(DiscountType::Flat, -1).is_err());
    }

    #[test]
    fn test_validate_tip() {
        assert!(validate_tip(Money::zero()).is_ok());
        assert!(validate_tip(Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_eta() {
        assert!(validate_eta_minutes(0).is_ok());
        assert!(validate_eta_minutes(-1).is_err());
        assert!(validate_eta_minutes(MAX_ETA_MINUTES + 1).is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(3.139, 101.686).is_ok());
        assert!(validate_coordinates(91.0, 0.0).is_err());
    }
}
