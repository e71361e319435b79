//! # courier-core: Pure Business Logic for Courier
//!
//! Every rule that decides whether money or a booking may move lives here,
//! as pure functions with zero I/O. The database layer loads rows inside a
//! transaction, asks this crate, and writes the answer back.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Courier Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 courier-api (axum, JWT)                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              courier-db (sqlx, one tx per business event)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ courier-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │ booking │ │  promo  │ │ invoice │  │   │
//! │  │   │ records │ │  cents  │ │  FSM    │ │ coupons │ │ tax     │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records and closed enumerations
//! - [`money`] - Integer-cent money with half-up rounding
//! - [`booking`] - Status transition table, OTP, cancel/refund plan, ETA
//! - [`promo`] - Coupon eligibility and discount computation
//! - [`rating`] - Driver rating aggregation
//! - [`invoice`] - Tax-inclusive invoice split and numbering
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use courier_core::money::Money;
//! use courier_core::types::TaxRate;
//!
//! let price = Money::from_cents(10_600);
//! let (subtotal, tax) = price.split_inclusive_tax(TaxRate::from_bps(600));
//! assert_eq!(subtotal.cents(), 10_000);
//! assert_eq!(tax.cents(), 600);
//! ```

pub mod booking;
pub mod error;
pub mod invoice;
pub mod money;
pub mod promo;
pub mod rating;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// ETA shown once a driver is assigned and no explicit ETA was given.
pub const DEFAULT_ASSIGNED_ETA_MINUTES: i64 = 10;

/// Upper bound accepted for an explicit ETA.
pub const MAX_ETA_MINUTES: i64 = 24 * 60;

pub const MAX_REVIEW_LEN: usize = 1000;

pub const MAX_REVIEW_TAGS: usize = 10;

/// Attempts at drawing an unused invoice number before giving up.
pub const INVOICE_NUMBER_ATTEMPTS: usize = 5;

// =============================================================================
// Policy
// =============================================================================

/// Business parameters that vary per deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Tax rate used for invoices.
    pub tax_rate: TaxRate,
    /// ISO currency code printed on invoices.
    pub currency: String,
    /// Credited to both referrer and referee.
    pub referral_reward: Money,
    /// Largest single wallet top-up.
    pub max_top_up: Money,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            tax_rate: TaxRate::from_bps(600),
            currency: "MYR".to_string(),
            referral_reward: Money::from_cents(500),
            max_top_up: Money::from_cents(100_000),
        }
    }
}
