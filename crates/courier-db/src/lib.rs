//! # courier-db: Database Layer for Courier
//!
//! SQLite persistence for the booking core, through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Courier Data Flow                                │
//! │                                                                         │
//! │  HTTP handler (POST /bookings/:id/cancel)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    courier-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ BookingRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ WalletRepo    │    │ 001_init.sql │  │   │
//! │  │   │ Policy        │    │ PromoRepo ... │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │ rules                         │   │
//! │  │                                ▼                               │   │
//! │  │                         courier-core                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courier_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("courier.db")).await?;
//! let view = db.wallets().view(&user_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    AddressRef, AddressRepository, AppliedPromo, BookingDetails, BookingRepository,
    DriverRatings, DriverRepository, EtaView, InvoiceRepository, NewAddress, NewBooking,
    NewCoupon, NewDriver, PromoRepository, RatingOutcome, RatingRepository, RatingSubmission,
    Reconciliation, ReferralInfo, ReferralRepository, ReviewEntry, StatusUpdate, UserRepository,
    VehicleRepository, WalletPayment, WalletRepository, WalletView,
};
