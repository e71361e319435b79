//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  A wallet whose balance must equal the sum of its ledger entries       │
//! │  cannot tolerate that drift.                                            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every stored amount is i64 cents. Every rounding point is explicit  │
//! │    and rounds half-up (away from zero) to whole cents.                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use courier_core::money::Money;
//!
//! let fare = Money::from_cents(10_000); // 100.00
//! let discount = fare.percentage(1000); // 10% → 10.00
//! assert_eq!((fare - discount).cents(), 9_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Rounding
// =============================================================================

/// Integer division rounding half away from zero.
///
/// `denominator` must be positive.
fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    if numerator >= 0 {
        (2 * numerator + denominator) / (2 * denominator)
    } else {
        -((-2 * numerator + denominator) / (2 * denominator))
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Signed so ledger entries can carry debits as negative amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use courier_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns `self * bps / 10000`, rounded half-up to whole cents.
    ///
    /// ## Example
    /// ```rust
    /// use courier_core::money::Money;
    ///
    /// // 10% of 100.00
    /// assert_eq!(Money::from_cents(10_000).percentage(1000).cents(), 1_000);
    /// // 15% of 0.25 = 0.0375 → 0.04
    /// assert_eq!(Money::from_cents(25).percentage(1500).cents(), 4);
    /// ```
    pub fn percentage(&self, bps: i64) -> Money {
        Money::from_cents(div_round_half_up(self.0 as i128 * bps as i128, 10_000) as i64)
    }

    /// Scales by `numerator / denominator`, rounded half-up to whole cents.
    ///
    /// Used for per-distance fares: `per_km.scale(meters, 1000)`.
    pub fn scale(&self, numerator: i64, denominator: i64) -> Money {
        Money::from_cents(
            div_round_half_up(self.0 as i128 * numerator as i128, denominator as i128) as i64,
        )
    }

    /// Splits a tax-inclusive amount into `(subtotal, tax)`.
    ///
    /// ```text
    /// subtotal = round(price / (1 + rate))
    /// tax      = price - subtotal
    /// ```
    ///
    /// Tax is derived by subtraction so the two parts always add back to the
    /// original price.
    ///
    /// ## Example
    /// ```rust
    /// use courier_core::money::Money;
    /// use courier_core::types::TaxRate;
    ///
    /// let (subtotal, tax) = Money::from_cents(10_600).split_inclusive_tax(TaxRate::from_bps(600));
    /// assert_eq!(subtotal.cents(), 10_000);
    /// assert_eq!(tax.cents(), 600);
    /// ```
    pub fn split_inclusive_tax(&self, rate: TaxRate) -> (Money, Money) {
        let subtotal = div_round_half_up(
            self.0 as i128 * 10_000,
            10_000 + rate.bps() as i128,
        ) as i64;
        let subtotal = Money::from_cents(subtotal);
        (subtotal, *self - subtotal)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering, currency code is the caller's concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 12.5% of 1.00 = 0.125 → 0.13
        assert_eq!(Money::from_cents(100).percentage(1250).cents(), 13);
        // 10% of 0.05 = 0.005 → 0.01
        assert_eq!(Money::from_cents(5).percentage(1000).cents(), 1);
        // 10% of 0.04 = 0.004 → 0.00
        assert_eq!(Money::from_cents(4).percentage(1000).cents(), 0);
    }

    #[test]
    fn test_scale_for_distance() {
        // 1.50 per km over 2,333 m = 3.4995 → 3.50
        assert_eq!(Money::from_cents(150).scale(2_333, 1_000).cents(), 350);
    }

    #[test]
    fn test_split_inclusive_tax_example() {
        let (subtotal, tax) = Money::from_cents(10_600).split_inclusive_tax(TaxRate::from_bps(600));
        assert_eq!(subtotal.cents(), 10_000);
        assert_eq!(tax.cents(), 600);
    }

    #[test]
    fn test_split_inclusive_tax_parts_sum_to_price() {
        for cents in [1, 99, 1_234, 9_999, 123_457] {
            let price = Money::from_cents(cents);
            let (subtotal, tax) = price.split_inclusive_tax(TaxRate::from_bps(600));
            assert_eq!(subtotal + tax, price);
        }
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-100).abs().cents(), 100);
    }
}
