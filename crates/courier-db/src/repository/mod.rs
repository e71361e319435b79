//! # Repository Module
//!
//! Database repository implementations for Courier.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Business Event = One Transaction                 │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │  db.bookings().cancel(id, user, reason)                         │
//! │       ▼                                                                 │
//! │  BookingRepository                                                     │
//! │  ├── tx = pool.begin()                                                 │
//! │  ├── touch booking row        ← first statement is a write:            │
//! │  │                              SQLite's write lock is taken here      │
//! │  ├── load rows, ask courier-core                                       │
//! │  ├── ledger::credit(&mut tx)  ← helpers share the same transaction     │
//! │  ├── UPDATE bookings ...                                               │
//! │  └── tx.commit()              ← or drop → rollback                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads that feed a decision happen after the first write of the unit, so
//! they see the latest committed state and nobody else can change it until
//! commit.
//!
//! ## Available Repositories
//!
//! - [`BookingRepository`] - Lifecycle: create, status, delivery, cancel, ETA
//! - [`WalletRepository`] - Balance, top-up, pay with wallet, reconcile
//! - [`PromoRepository`] - Coupon validation, application, listing
//! - [`ReferralRepository`] - Referral reward and summary
//! - [`RatingRepository`] - Ratings, tips, driver summaries
//! - [`InvoiceRepository`] - Idempotent invoice generation
//! - [`UserRepository`], [`AddressRepository`], [`DriverRepository`],
//!   [`VehicleRepository`] - Identity and reference data

pub mod address;
pub mod booking;
pub mod driver;
pub mod invoice;
pub mod ledger;
pub mod promo;
pub mod rating;
pub mod referral;
pub mod user;
pub mod vehicle;
pub mod wallet;

pub use address::{AddressRepository, NewAddress};
pub use booking::{
    AddressRef, BookingDetails, BookingRepository, EtaView, NewBooking, StatusUpdate,
};
pub use driver::{DriverRepository, NewDriver};
pub use invoice::InvoiceRepository;
pub use promo::{AppliedPromo, NewCoupon, PromoRepository};
pub use rating::{DriverRatings, RatingOutcome, RatingRepository, RatingSubmission, ReviewEntry};
pub use referral::{ReferralInfo, ReferralRepository};
pub use user::UserRepository;
pub use vehicle::VehicleRepository;
pub use wallet::{Reconciliation, WalletPayment, WalletRepository, WalletView};

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use courier_core::{Booking, CoreError};

use crate::error::DbResult;

/// New random entity ID.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Bumps `updated_at`, taking the write lock for the enclosing transaction.
///
/// Fails with `NotFound` when the booking doesn't exist.
pub(crate) async fn touch_booking(
    conn: &mut SqliteConnection,
    booking_id: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE bookings SET updated_at = ?2 WHERE id = ?1")
        .bind(booking_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::not_found("Booking", booking_id).into());
    }
    Ok(())
}

pub(crate) async fn fetch_booking(
    conn: &mut SqliteConnection,
    booking_id: &str,
) -> DbResult<Booking> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?1")
        .bind(booking_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Booking", booking_id).into())
}

/// User ID behind the booking's assigned driver, if the driver has one.
pub(crate) async fn driver_user_id(
    conn: &mut SqliteConnection,
    booking: &Booking,
) -> DbResult<Option<String>> {
    let Some(driver_id) = booking.driver_id.as_deref() else {
        return Ok(None);
    };
    let user_id: Option<Option<String>> =
        sqlx::query_scalar("SELECT user_id FROM drivers WHERE id = ?1")
            .bind(driver_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(user_id.flatten())
}

// =============================================================================
// Test Fixtures
// =============================================================================
