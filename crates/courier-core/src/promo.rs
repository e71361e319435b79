//! # Promo Rules
//!
//! Coupon eligibility and discount computation.
//!
//! ## Check Order
//! ```text
//! code exists? ─► active? ─► not expired? ─► uses left? ─► order ≥ minimum? ─► not yet used by caller?
//!  CodeNotFound   Inactive    Expired        UsageLimit     BelowMinimumOrder   AlreadyRedeemed
//! ```
//!
//! `CodeNotFound` is raised by the caller that looked the code up; everything
//! after that is decided here against a loaded [`Coupon`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Coupon, DiscountType};

/// Codes are compared upper-cased with surrounding whitespace removed.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub fn validate_code(code: &str) -> Result<String, ValidationError> {
    let code = normalize_code(code);
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }
    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 32,
        });
    }
    Ok(code)
}

/// Discount breakdown returned by validation and redemption.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountQuote {
    pub code: String,
    pub discount_type: DiscountType,
    pub order_amount_cents: i64,
    pub discount_cents: i64,
    pub final_amount_cents: i64,
}

impl Coupon {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used_count >= self.usage_limit
    }

    /// Discount this coupon gives on `order_amount`, ignoring eligibility.
    ///
    /// Percentage: `order × bps / 10000` rounded half-up, clamped to the cap.
    /// Flat: the value itself, never more than the order.
    pub fn discount_for(&self, order_amount: Money) -> Money {
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let pct = order_amount.percentage(self.discount_value);
                match self.max_discount_cents {
                    Some(cap) => pct.min(Money::from_cents(cap)),
                    None => pct,
                }
            }
            DiscountType::Flat => Money::from_cents(self.discount_value),
        };
        raw.min(order_amount).max(Money::zero())
    }
}

/// Runs every eligibility check and returns the discount.
pub fn evaluate(
    coupon: &Coupon,
    order_amount: Money,
    already_redeemed: bool,
    now: DateTime<Utc>,
) -> CoreResult<DiscountQuote> {
    if !coupon.is_active {
        return Err(CoreError::CodeInactive(coupon.code.clone()));
    }
    if coupon.is_expired(now) {
        return Err(CoreError::CodeExpired(coupon.code.clone()));
    }
    if coupon.is_exhausted() {
        return Err(CoreError::UsageLimitReached(coupon.code.clone()));
    }
    if order_amount.cents() < coupon.min_order_cents {
        return Err(CoreError::BelowMinimumOrder {
            minimum: Money::from_cents(coupon.min_order_cents),
        });
    }
    if already_redeemed {
        return Err(CoreError::AlreadyRedeemed(coupon.code.clone()));
    }

    let discount = coupon.discount_for(order_amount);
    Ok(DiscountQuote {
        code: coupon.code.clone(),
        discount_type: coupon.discount_type,
        order_amount_cents: order_amount.cents(),
        discount_cents: discount.cents(),
        final_amount_cents: (order_amount - discount).cents(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
