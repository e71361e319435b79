//! # Error Types
//!
//! Domain-specific error types for courier-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  courier-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  courier-db errors                                                     │
//! │  └── DbError          - Store failures, wraps CoreError                │
//! │                                                                         │
//! │  courier-api errors                                                    │
//! │  └── ApiError         - HTTP status + {success:false, message}         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `CoreError` belongs to exactly one [`ErrorKind`], which is what the
//! API layer maps to a status code.

use thiserror::Error;

use crate::money::Money;
use crate::types::BookingStatus;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// Unknown booking, coupon, driver, ...
    NotFound,
    /// Caller does not own the resource.
    Authorization,
    /// Illegal transition or exhausted/used/expired promotion.
    StateConflict,
    /// Wallet debit exceeds balance.
    InsufficientFunds,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Caller is neither the requester nor, where allowed, the assigned driver.
    #[error("Not allowed to access {entity} {id}")]
    Forbidden { entity: &'static str, id: String },

    // -------------------------------------------------------------------------
    // Booking lifecycle
    // -------------------------------------------------------------------------
    #[error("Booking {0} is already delivered")]
    AlreadyDelivered(String),

    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(String),

    /// Cancel on a terminal booking.
    #[error("Booking {booking_id} is {status:?} and cannot be cancelled")]
    NotCancellable {
        booking_id: String,
        status: BookingStatus,
    },

    #[error("Cannot move booking from {from:?} to {to:?}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Invalid delivery OTP")]
    InvalidOtp,

    #[error("A driver must be assigned first")]
    DriverRequired,

    /// Rating before delivery.
    #[error("Booking {0} has not been delivered yet")]
    NotDelivered(String),

    #[error("Booking {0} is already paid")]
    AlreadyPaid(String),

    /// Payment or promo on a cancelled/delivered/paid booking.
    #[error("Booking {0} can no longer be paid or discounted")]
    NotPayable(String),

    #[error("A promo code is already applied to booking {0}")]
    PromoAlreadyApplied(String),

    // -------------------------------------------------------------------------
    // Promotions
    // -------------------------------------------------------------------------
    #[error("Promo code not found: {0}")]
    CodeNotFound(String),

    #[error("Promo code {0} is not active")]
    CodeInactive(String),

    #[error("Promo code {0} has expired")]
    CodeExpired(String),

    #[error("Promo code {0} has reached its usage limit")]
    UsageLimitReached(String),

    #[error("Minimum order amount for this code is {minimum}")]
    BelowMinimumOrder { minimum: Money },

    #[error("You have already used promo code {0}")]
    AlreadyRedeemed(String),

    // -------------------------------------------------------------------------
    // Referrals
    // -------------------------------------------------------------------------
    #[error("Invalid referral code: {0}")]
    InvalidReferralCode(String),

    #[error("You cannot use your own referral code")]
    SelfReferral,

    #[error("You have already used a referral code")]
    AlreadyReferred,

    // -------------------------------------------------------------------------
    // Ledger
    // -------------------------------------------------------------------------
    #[error("Insufficient wallet balance: available {available}, required {required}")]
    InsufficientFunds { available: Money, required: Money },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn forbidden(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::Forbidden {
            entity,
            id: id.into(),
        }
    }

    /// Classification used by the API layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } | CoreError::CodeNotFound(_) => ErrorKind::NotFound,

            CoreError::Forbidden { .. } => ErrorKind::Authorization,

            CoreError::AlreadyDelivered(_)
            | CoreError::AlreadyCancelled(_)
            | CoreError::NotCancellable { .. }
            | CoreError::InvalidTransition { .. }
            | CoreError::NotDelivered(_)
            | CoreError::AlreadyPaid(_)
            | CoreError::NotPayable(_)
            | CoreError::PromoAlreadyApplied(_)
            | CoreError::CodeInactive(_)
            | CoreError::CodeExpired(_)
            | CoreError::UsageLimitReached(_)
            | CoreError::AlreadyRedeemed(_)
            | CoreError::AlreadyReferred => ErrorKind::StateConflict,

            CoreError::InvalidOtp
            | CoreError::DriverRequired
            | CoreError::BelowMinimumOrder { .. }
            | CoreError::InvalidReferralCode(_)
            | CoreError::SelfReferral
            | CoreError::Validation(_) => ErrorKind::Validation,

            CoreError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientFunds {
            available: Money::from_cents(300),
            required: Money::from_cents(1250),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient wallet balance: available 3.00, required 12.50"
        );

        let err = CoreError::not_found("Booking", "b-1");
        assert_eq!(err.to_string(), "Booking not found: b-1");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "otp".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            CoreError::UsageLimitReached("SAVE10".into()).kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(CoreError::forbidden("Wallet", "w").kind(), ErrorKind::Authorization);
        assert_eq!(CoreError::CodeNotFound("X".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::InsufficientFunds {
                available: Money::zero(),
                required: Money::from_cents(1),
            }
            .kind(),
            ErrorKind::InsufficientFunds
        );
    }
}
