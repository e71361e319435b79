//! # Rating Aggregation
//!
//! A driver's rating is the mean of every rating left on that driver's
//! delivered bookings, rounded half-up to one decimal.

use crate::error::ValidationError;
use crate::MAX_REVIEW_TAGS;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Mean of `sum / count`, rounded half-up to one decimal. Zero when empty.
///
/// ## Example
/// ```rust
/// use courier_core::rating::mean_rating;
///
/// assert_eq!(mean_rating(4 + 5 + 3, 3), 4.0);
/// assert_eq!(mean_rating(4 + 5, 2), 4.5);
/// ```
pub fn mean_rating(sum: i64, count: i64) -> f64 {
    if count <= 0 {
        return 0.0;
    }
    // Work in tenths to keep the rounding point exact.
    let tenths = (sum * 10 * 2 + count) / (2 * count);
    tenths as f64 / 10.0
}

pub fn validate_rating(rating: i64) -> Result<(), ValidationError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: MIN_RATING,
            max: MAX_RATING,
        });
    }
    Ok(())
}

/// Trims tags, drops empties and duplicates, enforces limits.
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        if tag.len() > 32 {
            return Err(ValidationError::TooLong {
                field: "tag".to_string(),
                max: 32,
            });
        }
        out.push(tag.to_string());
    }
    if out.len() > MAX_REVIEW_TAGS {
        return Err(ValidationError::OutOfRange {
            field: "tags".to_string(),
            min: 0,
            max: MAX_REVIEW_TAGS as i64,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_rating_example() {
        assert_eq!(mean_rating(4 + 5 + 3, 3), 4.0);
    }

    #[test]
    fn test_mean_rating_rounds_half_up() {
        // 4.25 → 4.3
        assert_eq!(mean_rating(5 + 5 + 5 + 2, 4), 4.3);
        // 4.666.. → 4.7
        assert_eq!(mean_rating(5 + 5 + 4, 3), 4.7);
        assert_eq!(mean_rating(0, 0), 0.0);
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![" polite ".to_string(), "polite".to_string(), "".to_string()];
        assert_eq!(normalize_tags(&tags).unwrap(), vec!["polite".to_string()]);

        let many: Vec<String> = (0..20).map(|i| format!("t{}", i)).collect();
        assert!(normalize_tags(&many).is_err());
    }
}
