//! # Domain Types
//!
//! Core domain types used throughout Courier.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Booking      │   │     Wallet      │   │     Coupon      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  status         │   │  balance_cents  │   │  code (UPPER)   │       │
//! │  │  payment_*      │   │  owner (1:1)    │   │  used/limit     │       │
//! │  │  delivery_otp   │   └────────┬────────┘   └────────┬────────┘       │
//! │  └───┬─────────┬───┘            │                     │                 │
//! │      │         │       ┌────────┴────────┐   ┌────────┴────────┐       │
//! │  ┌───┴───┐ ┌───┴────┐  │WalletTransaction│   │   UserCoupon    │       │
//! │  │ Order │ │Invoice │  │ signed amount   │   │ (user, coupon)  │       │
//! │  │ 1:1   │ │ 1:1    │  │ append-only     │   │ one redemption  │       │
//! │  └───────┘ └────────┘  └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Enumerations are stored as lowercase snake_case text and serialized to
//! clients as SCREAMING_SNAKE_CASE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 600 bps = 6%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a fraction (for display only).
    #[inline]
    pub fn as_fraction(&self) -> f64 {
        self.0 as f64 / 10_000.0
    }
}

// =============================================================================
// Booking Status
// =============================================================================

/// Lifecycle state of a booking. Transition rules live in [`crate::booking`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    SearchingDriver,
    DriverAssigned,
    DriverArrived,
    PickupDone,
    InTransit,
    /// Terminal.
    Delivered,
    /// Terminal.
    Cancelled,
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

// =============================================================================
// Payment Method / Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Collected by the driver on delivery.
    Cash,
    /// Debited from the requester's wallet.
    Wallet,
    /// Settled by an external gateway before delivery.
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Ledger Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    TopUp,
    Payment,
    Refund,
    ReferralBonus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `discount_value` is basis points of the order amount.
    Percentage,
    /// `discount_value` is cents.
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    /// Rewards were credited in the same transaction that created the record.
    Completed,
}

// =============================================================================
// Identity & Reference Data
// =============================================================================

/// An authenticated user, as far as this core needs to know one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    /// Uppercase, unique.
    pub referral_code: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: String,
    pub user_id: String,
    pub label: Option<String>,
    pub line1: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    /// Login identity of the driver, when the driver uses the app.
    pub user_id: Option<String>,
    pub name: String,
    pub phone: String,
    pub vehicle_type: String,
    pub vehicle_number: String,
    /// Mean rating, one decimal.
    pub rating: f64,
    pub total_trips: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A vehicle class and its fare table.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VehicleType {
    /// Machine name, e.g. `bike`, `van`.
    pub code: String,
    pub name: String,
    pub capacity_kg: i64,
    pub base_fare_cents: i64,
    pub per_km_cents: i64,
}

impl VehicleType {
    /// Fare estimate: base fare plus the per-km rate over `distance_meters`.
    pub fn estimate_fare(&self, distance_meters: i64) -> Money {
        Money::from_cents(self.base_fare_cents)
            + Money::from_cents(self.per_km_cents).scale(distance_meters, 1_000)
    }
}

// =============================================================================
// Booking
// =============================================================================

/// A single pickup-to-delivery transport request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    /// Requester.
    pub user_id: String,
    pub pickup_address_id: String,
    pub delivery_address_id: String,
    pub driver_id: Option<String>,
    pub vehicle_type: String,
    #[ts(as = "Option<String>")]
    pub scheduled_at: Option<DateTime<Utc>>,
    pub estimated_price_cents: i64,
    pub discount_cents: i64,
    /// Authoritative once delivered, or once paid from the wallet.
    pub final_price_cents: Option<i64>,
    pub promo_code: Option<String>,
    pub distance_meters: i64,
    pub duration_minutes: i64,
    pub eta_minutes: Option<i64>,
    pub status: BookingStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Four digits, handed to the driver at the door.
    pub delivery_otp: String,
    pub delivery_proof_url: Option<String>,
    pub cancel_reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    #[inline]
    pub fn estimated_price(&self) -> Money {
        Money::from_cents(self.estimated_price_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    /// `estimated - discount`, the price before a final price is fixed.
    #[inline]
    pub fn working_price(&self) -> Money {
        self.estimated_price() - self.discount()
    }

    /// What the requester is charged: the final price when fixed, otherwise
    /// the working price.
    pub fn charge_amount(&self) -> Money {
        self.final_price_cents
            .map(Money::from_cents)
            .unwrap_or_else(|| self.working_price())
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// =============================================================================
// Wallet & Ledger
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub user_id: String,
    pub balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// Immutable ledger entry. Debits are negative.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: String,
    pub wallet_id: String,
    pub amount_cents: i64,
    pub kind: TransactionKind,
    pub description: String,
    /// e.g. the booking a payment or refund belongs to.
    pub reference_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Promotions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,
    /// Uppercase, unique.
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Basis points for percentage coupons, cents for flat ones.
    pub discount_value: i64,
    /// Cap for percentage coupons.
    pub max_discount_cents: Option<i64>,
    pub min_order_cents: i64,
    pub usage_limit: i64,
    pub used_count: i64,
    pub is_active: bool,
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Records that a user redeemed a coupon. At most one per pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserCoupon {
    pub user_id: String,
    pub coupon_id: String,
    pub booking_id: Option<String>,
    #[ts(as = "String")]
    pub redeemed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: String,
    pub referrer_id: String,
    /// Unique: a user is referred at most once.
    pub referee_id: String,
    pub code: String,
    pub reward_cents: i64,
    pub status: ReferralStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order & Invoice
// =============================================================================

/// Completion record of a delivered booking: rating, review, tip.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub booking_id: String,
    pub user_id: String,
    pub driver_id: Option<String>,
    pub rating: Option<i64>,
    pub review: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub tags: Vec<String>,
    pub tip_cents: i64,
    #[ts(as = "String")]
    pub completed_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Tax-inclusive invoice. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub booking_id: String,
    pub invoice_number: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub tax_rate_bps: i64,
    pub currency: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(6.0);
        assert_eq!(rate.bps(), 600);
        assert!((rate.as_fraction() - 0.06).abs() < f64::EPSILON);
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&BookingStatus::SearchingDriver).unwrap();
        assert_eq!(json, "\"SEARCHING_DRIVER\"");

        let parsed: BookingStatus = serde_json::from_str("\"IN_TRANSIT\"").unwrap();
        assert_eq!(parsed, BookingStatus::InTransit);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(serde_json::from_str::<BookingStatus>("\"TELEPORTED\"").is_err());
    }

    #[test]
    fn test_vehicle_fare_estimate() {
        let van = VehicleType {
            code: "van".into(),
            name: "Van".into(),
            capacity_kg: 800,
            base_fare_cents: 2_000,
            per_km_cents: 150,
        };
        // 20.00 + 1.50 × 12.4 km = 38.60
        assert_eq!(van.estimate_fare(12_400).cents(), 3_860);
    }
}
