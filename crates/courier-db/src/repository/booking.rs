//! # Booking Repository
//!
//! Persistence side of the booking state machine.
//!
//! ## Booking Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Booking Lifecycle                                 │
//! │                                                                         │
//! │  create() ──► PENDING ──► SEARCHING_DRIVER ──► DRIVER_ASSIGNED ──►     │
//! │               DRIVER_ARRIVED ──► PICKUP_DONE ──► IN_TRANSIT             │
//! │                   │                                  │                  │
//! │                   │ cancel()                         │ verify_delivery()│
//! │                   │ update_status(CANCELLED)         │ update_status(   │
//! │                   ▼                                  ▼   DELIVERED)     │
//! │               CANCELLED                          DELIVERED              │
//! │               └─ refund if paid from wallet      ├─ cash → COMPLETED    │
//! │                                                  ├─ order upserted      │
//! │                                                  └─ driver trips + 1    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation and delivery each have exactly one implementation
//! (`apply_cancel`, `finalize_delivery`); the generic status update routes
//! to them so no path can mark a booking refunded without moving money.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use courier_core::booking::{
    check_status_update, check_verify_delivery, ensure_participant, ensure_requester,
    generate_otp, payment_status_on_delivery, plan_cancel, project_eta, EtaProjection,
};
use courier_core::validation::{
    validate_distance_meters, validate_duration_minutes, validate_eta_minutes,
    validate_optional_text,
};
use courier_core::{
    Address, Booking, BookingStatus, CoreError, Driver, Invoice, Money, Order, PaymentMethod,
    PaymentStatus, TransactionKind, VehicleType,
};

use super::address::{insert_address, NewAddress};
use super::ledger::{self, Posting};
use super::{driver_user_id, fetch_booking, new_id, touch_booking};
use crate::error::DbResult;

// =============================================================================
// Inputs & Views
// =============================================================================

/// Pickup or delivery location: a saved address of the caller, or a new one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AddressRef {
    Existing { id: String },
    New(NewAddress),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub pickup_address: AddressRef,
    pub delivery_address: AddressRef,
    pub vehicle_type: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Route length from the mapping provider.
    #[serde(default)]
    pub distance_meters: i64,
    #[serde(default)]
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: BookingStatus,
    /// Minutes until the next milestone.
    #[serde(default)]
    pub eta: Option<i64>,
    /// Driver to put on the booking, typically with `DRIVER_ASSIGNED`.
    #[serde(default)]
    pub driver_id: Option<String>,
    /// Only used with `CANCELLED`.
    #[serde(default)]
    pub reason: Option<String>,
}

impl StatusUpdate {
    pub fn to(status: BookingStatus) -> Self {
        StatusUpdate {
            status,
            eta: None,
            driver_id: None,
            reason: None,
        }
    }
}

/// A booking with everything it references.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub pickup_address: Address,
    pub delivery_address: Address,
    pub driver: Option<Driver>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<Invoice>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EtaView {
    #[serde(flatten)]
    pub projection: EtaProjection,
    pub driver: Option<Driver>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for booking lifecycle operations.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: SqlitePool,
}

impl BookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BookingRepository { pool }
    }

    /// Creates a PENDING booking with a fresh OTP.
    ///
    /// ## What This Does
    /// 1. Validates route figures and the vehicle class
    /// 2. Resolves each address: saved ones must belong to the caller
    /// 3. In one transaction: inserts inline addresses, then the booking
    pub async fn create(&self, user_id: &str, input: NewBooking) -> DbResult<BookingDetails> {
        validate_distance_meters(input.distance_meters)?;
        validate_duration_minutes(input.duration_minutes)?;

        let vehicle = sqlx::query_as::<_, VehicleType>(
            "SELECT * FROM vehicle_types WHERE code = ?1",
        )
        .bind(&input.vehicle_type)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("VehicleType", &input.vehicle_type))?;

        let pickup = self.resolve_address(user_id, &input.pickup_address).await?;
        let delivery = self.resolve_address(user_id, &input.delivery_address).await?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let pickup = pickup.persist(&mut tx, user_id, now).await?;
        let delivery = delivery.persist(&mut tx, user_id, now).await?;

        let booking = Booking {
            id: new_id(),
            user_id: user_id.to_string(),
            pickup_address_id: pickup.id.clone(),
            delivery_address_id: delivery.id.clone(),
            driver_id: None,
            vehicle_type: vehicle.code.clone(),
            scheduled_at: input.scheduled_at,
            estimated_price_cents: vehicle.estimate_fare(input.distance_meters).cents(),
            discount_cents: 0,
            final_price_cents: None,
            promo_code: None,
            distance_meters: input.distance_meters,
            duration_minutes: input.duration_minutes,
            eta_minutes: None,
            status: BookingStatus::Pending,
            payment_method: input.payment_method,
            payment_status: PaymentStatus::Pending,
            delivery_otp: generate_otp(),
            delivery_proof_url: None,
            cancel_reason: None,
            created_at: now,
            delivered_at: None,
            cancelled_at: None,
            updated_at: now,
        };

        insert_booking(&mut tx, &booking).await?;
        tx.commit().await?;

        info!(
            booking_id = %booking.id,
            user_id = %user_id,
            estimated_price_cents = booking.estimated_price_cents,
            "Booking created"
        );

        Ok(BookingDetails {
            booking,
            pickup_address: pickup,
            delivery_address: delivery,
            driver: None,
            order: None,
            invoice: None,
        })
    }

    /// The caller's booking with addresses, driver, order and invoice.
    pub async fn get(&self, booking_id: &str, user_id: &str) -> DbResult<BookingDetails> {
        let mut conn = self.pool.acquire().await?;
        let booking = fetch_booking(&mut conn, booking_id).await?;
        ensure_requester(&booking, user_id)?;

        debug!(booking_id = %booking_id, "Booking loaded");
        load_details(&mut conn, booking, true).await
    }

    /// The caller's bookings, newest first, optionally filtered by status.
    pub async fn list(
        &self,
        user_id: &str,
        status: Option<BookingStatus>,
    ) -> DbResult<Vec<BookingDetails>> {
        let mut conn = self.pool.acquire().await?;
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_all(&mut *conn)
        .await?;

        let mut out = Vec::with_capacity(bookings.len());
        for booking in bookings {
            out.push(load_details(&mut conn, booking, false).await?);
        }
        Ok(out)
    }

    /// OTP-gated delivery confirmation by the requester or the driver.
    pub async fn verify_delivery(
        &self,
        booking_id: &str,
        user_id: &str,
        otp: &str,
        proof_url: Option<&str>,
    ) -> DbResult<Booking> {
        let proof_url = validate_optional_text("deliveryProofUrl", proof_url, 500)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        touch_booking(&mut tx, booking_id, now).await?;
        let booking = fetch_booking(&mut tx, booking_id).await?;
        let driver_user = driver_user_id(&mut tx, &booking).await?;
        ensure_participant(&booking, user_id, driver_user.as_deref())?;
        check_verify_delivery(&booking, otp)?;

        finalize_delivery(&mut tx, &booking, proof_url.as_deref(), now).await?;

        let booking = fetch_booking(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, "Delivery verified");
        Ok(booking)
    }

    /// Moves a booking along the lifecycle.
    ///
    /// `CANCELLED` and `DELIVERED` run the same units of work as
    /// [`cancel`](Self::cancel) and [`verify_delivery`](Self::verify_delivery)
    /// (minus the OTP).
    pub async fn update_status(
        &self,
        booking_id: &str,
        user_id: &str,
        update: StatusUpdate,
    ) -> DbResult<Booking> {
        if let Some(eta) = update.eta {
            validate_eta_minutes(eta)?;
        }
        let reason = validate_optional_text("reason", update.reason.as_deref(), 500)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        touch_booking(&mut tx, booking_id, now).await?;
        let booking = fetch_booking(&mut tx, booking_id).await?;
        let driver_user = driver_user_id(&mut tx, &booking).await?;
        ensure_participant(&booking, user_id, driver_user.as_deref())?;

        match update.status {
            BookingStatus::Cancelled => {
                apply_cancel(&mut tx, &booking, reason.as_deref(), now).await?;
            }
            BookingStatus::Delivered => {
                // Drivers prove delivery with the OTP; only the requester may skip it.
                ensure_requester(&booking, user_id)?;
                check_status_update(&booking, BookingStatus::Delivered, true)?;
                finalize_delivery(&mut tx, &booking, None, now).await?;
            }
            next => {
                if let Some(driver_id) = update.driver_id.as_deref() {
                    let exists: Option<String> =
                        sqlx::query_scalar("SELECT id FROM drivers WHERE id = ?1")
                            .bind(driver_id)
                            .fetch_optional(&mut *tx)
                            .await?;
                    if exists.is_none() {
                        return Err(CoreError::not_found("Driver", driver_id).into());
                    }
                }
                let driver_known = booking.driver_id.is_some() || update.driver_id.is_some();
                check_status_update(&booking, next, driver_known)?;

                sqlx::query(
                    r#"
                    UPDATE bookings SET
                        status = ?2,
                        driver_id = COALESCE(?3, driver_id),
                        eta_minutes = COALESCE(?4, eta_minutes),
                        updated_at = ?5
                    WHERE id = ?1
                    "#,
                )
                .bind(booking_id)
                .bind(next)
                .bind(update.driver_id.as_deref())
                .bind(update.eta)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }

        let updated = fetch_booking(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(
            booking_id = %booking_id,
            from = ?booking.status,
            to = ?updated.status,
            "Booking status updated"
        );
        Ok(updated)
    }

    /// Cancels the caller's booking, refunding a wallet payment.
    pub async fn cancel(
        &self,
        booking_id: &str,
        user_id: &str,
        reason: Option<&str>,
    ) -> DbResult<Booking> {
        let reason = validate_optional_text("reason", reason, 500)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        touch_booking(&mut tx, booking_id, now).await?;
        let booking = fetch_booking(&mut tx, booking_id).await?;
        ensure_requester(&booking, user_id)?;

        let refund = apply_cancel(&mut tx, &booking, reason.as_deref(), now).await?;

        let booking = fetch_booking(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(
            booking_id = %booking_id,
            refund_cents = refund.map(|m| m.cents()).unwrap_or(0),
            "Booking cancelled"
        );
        Ok(booking)
    }

    /// Phase message and ETA. Read-only.
    pub async fn eta(&self, booking_id: &str, user_id: &str) -> DbResult<EtaView> {
        let mut conn = self.pool.acquire().await?;
        let booking = fetch_booking(&mut conn, booking_id).await?;
        let driver_user = driver_user_id(&mut conn, &booking).await?;
        ensure_participant(&booking, user_id, driver_user.as_deref())?;

        let driver = load_driver(&mut conn, booking.driver_id.as_deref()).await?;
        Ok(EtaView {
            projection: project_eta(&booking),
            driver,
        })
    }

    async fn resolve_address(&self, user_id: &str, address: &AddressRef) -> DbResult<Resolved> {
        match address {
            AddressRef::Existing { id } => {
                let saved = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Address", id))?;
                if saved.user_id != user_id {
                    return Err(CoreError::forbidden("Address", id).into());
                }
                Ok(Resolved::Saved(saved))
            }
            AddressRef::New(new) => Ok(Resolved::Inline(new.validated()?)),
        }
    }
}

/// An address ready to be referenced by a new booking.
enum Resolved {
    Saved(Address),
    Inline(NewAddress),
}

impl Resolved {
    async fn persist(
        self,
        conn: &mut SqliteConnection,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Address> {
        match self {
            Resolved::Saved(address) => Ok(address),
            Resolved::Inline(new) => insert_address(conn, user_id, &new, now).await,
        }
    }
}

// =============================================================================
// Units of Work
// =============================================================================

/// Marks the booking delivered, upserts its order and counts the trip.
async fn finalize_delivery(
    conn: &mut SqliteConnection,
    booking: &Booking,
    proof_url: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE bookings SET
            status = ?2,
            payment_status = ?3,
            final_price_cents = COALESCE(final_price_cents, ?4),
            delivery_proof_url = COALESCE(?5, delivery_proof_url),
            eta_minutes = 0,
            delivered_at = ?6,
            updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(&booking.id)
    .bind(BookingStatus::Delivered)
    .bind(payment_status_on_delivery(booking))
    .bind(booking.working_price().cents())
    .bind(proof_url)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, booking_id, user_id, driver_id, rating, review, tags,
            tip_cents, completed_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, NULL, NULL, '[]', 0, ?5, ?5)
        ON CONFLICT(booking_id) DO UPDATE SET
            driver_id = excluded.driver_id,
            completed_at = excluded.completed_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(new_id())
    .bind(&booking.id)
    .bind(&booking.user_id)
    .bind(&booking.driver_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if let Some(driver_id) = booking.driver_id.as_deref() {
        sqlx::query("UPDATE drivers SET total_trips = total_trips + 1 WHERE id = ?1")
            .bind(driver_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Cancels the booking; a completed wallet payment is credited back in the
/// same transaction. Returns the refunded amount.
async fn apply_cancel(
    conn: &mut SqliteConnection,
    booking: &Booking,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<Option<Money>> {
    let plan = plan_cancel(booking)?;

    if let Some(refund) = plan.refund.filter(|r| r.is_positive()) {
        ledger::credit(
            conn,
            Posting {
                user_id: &booking.user_id,
                amount: refund,
                kind: TransactionKind::Refund,
                description: "Refund for cancelled booking",
                reference_id: Some(&booking.id),
            },
            now,
        )
        .await?;
    }

    let payment_status = if plan.refund.is_some() {
        PaymentStatus::Refunded
    } else {
        booking.payment_status
    };

    sqlx::query(
        r#"
        UPDATE bookings SET
            status = ?2,
            payment_status = ?3,
            cancel_reason = COALESCE(?4, cancel_reason),
            eta_minutes = 0,
            cancelled_at = ?5,
            updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(&booking.id)
    .bind(BookingStatus::Cancelled)
    .bind(payment_status)
    .bind(reason)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(plan.refund)
}

// =============================================================================
// Row Helpers
// =============================================================================

async fn insert_booking(conn: &mut SqliteConnection, b: &Booking) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bookings (
            id, user_id, pickup_address_id, delivery_address_id, driver_id,
            vehicle_type, scheduled_at, estimated_price_cents, discount_cents,
            final_price_cents, promo_code, distance_meters, duration_minutes,
            eta_minutes, status, payment_method, payment_status, delivery_otp,
            delivery_proof_url, cancel_reason, created_at, delivered_at,
            cancelled_at, updated_at
        )
        VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
            ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24
        )
        "#,
    )
    .bind(&b.id)
    .bind(&b.user_id)
    .bind(&b.pickup_address_id)
    .bind(&b.delivery_address_id)
    .bind(&b.driver_id)
    .bind(&b.vehicle_type)
    .bind(b.scheduled_at)
    .bind(b.estimated_price_cents)
    .bind(b.discount_cents)
    .bind(b.final_price_cents)
    .bind(&b.promo_code)
    .bind(b.distance_meters)
    .bind(b.duration_minutes)
    .bind(b.eta_minutes)
    .bind(b.status)
    .bind(b.payment_method)
    .bind(b.payment_status)
    .bind(&b.delivery_otp)
    .bind(&b.delivery_proof_url)
    .bind(&b.cancel_reason)
    .bind(b.created_at)
    .bind(b.delivered_at)
    .bind(b.cancelled_at)
    .bind(b.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn load_driver(
    conn: &mut SqliteConnection,
    driver_id: Option<&str>,
) -> DbResult<Option<Driver>> {
    let Some(driver_id) = driver_id else {
        return Ok(None);
    };
    let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = ?1")
        .bind(driver_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(driver)
}

async fn load_details(
    conn: &mut SqliteConnection,
    booking: Booking,
    with_records: bool,
) -> DbResult<BookingDetails> {
    let pickup_address = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = ?1")
        .bind(&booking.pickup_address_id)
        .fetch_one(&mut *conn)
        .await?;
    let delivery_address = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = ?1")
        .bind(&booking.delivery_address_id)
        .fetch_one(&mut *conn)
        .await?;
    let driver = load_driver(conn, booking.driver_id.as_deref()).await?;

    let (order, invoice) = if with_records {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE booking_id = ?1")
            .bind(&booking.id)
            .fetch_optional(&mut *conn)
            .await?;
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE booking_id = ?1")
            .bind(&booking.id)
            .fetch_optional(&mut *conn)
            .await?;
        (order, invoice)
    } else {
        (None, None)
    };

    Ok(BookingDetails {
        booking,
        pickup_address,
        delivery_address,
        driver,
        order,
        invoice,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::testing::{fixture, sample_address};

    fn assign(driver_id: &str) -> StatusUpdate {
        StatusUpdate {
            status: BookingStatus::DriverAssigned,
            eta: Some(7),
            driver_id: Some(driver_id.to_string()),
            reason: None,
        }
    }

    #[tokio::test]
    async fn test_create_with_inline_addresses() {
        let fx = fixture().await;
        let details = fx
            .db
            .bookings()
            .create(
                &fx.user.id,
                NewBooking {
                    pickup_address: AddressRef::New(sample_address("10 Jalan Pinang")),
                    delivery_address: AddressRef::Existing {
                        id: fx.dropoff.id.clone(),
                    },
                    vehicle_type: "bike".into(),
                    payment_method: PaymentMethod::Cash,
                    scheduled_at: None,
                    distance_meters: 2_000,
                    duration_minutes: 10,
                },
            )
            .await
            .unwrap();

        assert_eq!(details.booking.status, BookingStatus::Pending);
        assert_eq!(details.booking.payment_status, PaymentStatus::Pending);
        assert_eq!(details.booking.estimated_price_cents, 700);
        assert_eq!(details.booking.delivery_otp.len(), 4);
        assert_eq!(details.pickup_address.line1, "10 Jalan Pinang");
        assert_eq!(details.delivery_address.id, fx.dropoff.id);
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_address_and_unknown_vehicle() {
        let fx = fixture().await;
        let foreign = NewBooking {
            pickup_address: AddressRef::Existing {
                id: fx.pickup.id.clone(),
            },
            delivery_address: AddressRef::New(sample_address("1 Jalan Other")),
            vehicle_type: "bike".into(),
            payment_method: PaymentMethod::Cash,
            scheduled_at: None,
            distance_meters: 1_000,
            duration_minutes: 5,
        };
        let err = fx.db.bookings().create(&fx.other.id, foreign.clone()).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden { .. })));

        let mut lorry = foreign;
        lorry.vehicle_type = "lorry".into();
        let err = fx.db.bookings().create(&fx.user.id, lorry).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_verify_delivery_once() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Cash).await;
        let bookings = fx.db.bookings();

        let wrong = bookings
            .verify_delivery(&booking.id, &fx.user.id, "99999", None)
            .await
            .unwrap_err();
        assert!(matches!(wrong, DbError::Domain(CoreError::Validation(_))));

        let delivered = bookings
            .verify_delivery(
                &booking.id,
                &fx.user.id,
                &booking.delivery_otp,
                Some("https://proofs.example/1.jpg"),
            )
            .await
            .unwrap();
        assert_eq!(delivered.status, BookingStatus::Delivered);
        assert_eq!(delivered.payment_status, PaymentStatus::Completed);
        assert_eq!(delivered.final_price_cents, Some(1_450));
        assert!(delivered.delivered_at.is_some());
        assert_eq!(
            delivered.delivery_proof_url.as_deref(),
            Some("https://proofs.example/1.jpg")
        );

        let again = bookings
            .verify_delivery(&booking.id, &fx.user.id, &booking.delivery_otp, None)
            .await
            .unwrap_err();
        assert!(matches!(again, DbError::Domain(CoreError::AlreadyDelivered(_))));

        let details = bookings.get(&booking.id, &fx.user.id).await.unwrap();
        let order = details.order.unwrap();
        assert_eq!(order.rating, None);
        assert!(order.tags.is_empty());
    }

    #[tokio::test]
    async fn test_verify_delivery_wrong_otp() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Cash).await;
        let wrong = if booking.delivery_otp == "0000" { "1111" } else { "0000" };

        let err = fx
            .db
            .bookings()
            .verify_delivery(&booking.id, &fx.user.id, wrong, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidOtp)));
    }

    #[tokio::test]
    async fn test_card_payment_untouched_on_delivery() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Card).await;

        let delivered = fx.deliver(&booking).await;
        assert_eq!(delivered.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_driver_drives_lifecycle_but_cannot_skip_otp() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Cash).await;
        let bookings = fx.db.bookings();

        let err = bookings
            .update_status(
                &booking.id,
                &fx.user.id,
                StatusUpdate::to(BookingStatus::DriverAssigned),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::DriverRequired)));

        let assigned = bookings
            .update_status(&booking.id, &fx.user.id, assign(&fx.driver.id))
            .await
            .unwrap();
        assert_eq!(assigned.driver_id.as_deref(), Some(fx.driver.id.as_str()));
        assert_eq!(assigned.eta_minutes, Some(7));

        // The assigned driver's user may now move the booking along.
        let arrived = bookings
            .update_status(
                &booking.id,
                &fx.driver_user.id,
                StatusUpdate::to(BookingStatus::DriverArrived),
            )
            .await
            .unwrap();
        assert_eq!(arrived.status, BookingStatus::DriverArrived);

        let back = bookings
            .update_status(
                &booking.id,
                &fx.driver_user.id,
                StatusUpdate::to(BookingStatus::SearchingDriver),
            )
            .await
            .unwrap_err();
        assert!(matches!(back, DbError::Domain(CoreError::InvalidTransition { .. })));

        let stranger = bookings
            .update_status(
                &booking.id,
                &fx.other.id,
                StatusUpdate::to(BookingStatus::PickupDone),
            )
            .await
            .unwrap_err();
        assert!(matches!(stranger, DbError::Domain(CoreError::Forbidden { .. })));

        let driver_skips_otp = bookings
            .update_status(
                &booking.id,
                &fx.driver_user.id,
                StatusUpdate::to(BookingStatus::Delivered),
            )
            .await
            .unwrap_err();
        assert!(matches!(driver_skips_otp, DbError::Domain(CoreError::Forbidden { .. })));
        let still_open = bookings.get(&booking.id, &fx.user.id).await.unwrap();
        assert_eq!(still_open.booking.status, BookingStatus::DriverArrived);

        let delivered = bookings
            .update_status(
                &booking.id,
                &fx.user.id,
                StatusUpdate::to(BookingStatus::Delivered),
            )
            .await
            .unwrap();
        assert_eq!(delivered.status, BookingStatus::Delivered);

        let driver = fx.db.drivers().require(&fx.driver.id).await.unwrap();
        assert_eq!(driver.total_trips, 1);
    }

    #[tokio::test]
    async fn test_assign_unknown_driver() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Cash).await;

        let err = fx
            .db
            .bookings()
            .update_status(&booking.id, &fx.user.id, assign("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_cancel_refunds_wallet_payment() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Wallet).await;
        fx.fund(&fx.user.id, 2_000).await;
        fx.db.wallets().pay_booking(&booking.id, &fx.user.id).await.unwrap();

        let cancelled = fx
            .db
            .bookings()
            .cancel(&booking.id, &fx.user.id, Some("changed my mind"))
            .await
            .unwrap();

        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("changed my mind"));

        let view = fx.db.wallets().view(&fx.user.id).await.unwrap();
        assert_eq!(view.wallet.balance_cents, 2_000);
        assert_eq!(view.recent_transactions[0].kind, TransactionKind::Refund);
        assert_eq!(view.recent_transactions[0].amount_cents, 1_450);
        assert!(fx.db.wallets().reconcile(&fx.user.id).await.unwrap().is_balanced());
    }

    #[tokio::test]
    async fn test_status_cancel_moves_money_like_cancel() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Wallet).await;
        fx.fund(&fx.user.id, 1_450).await;
        fx.db.wallets().pay_booking(&booking.id, &fx.user.id).await.unwrap();

        let cancelled = fx
            .db
            .bookings()
            .update_status(
                &booking.id,
                &fx.user.id,
                StatusUpdate::to(BookingStatus::Cancelled),
            )
            .await
            .unwrap();

        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        let view = fx.db.wallets().view(&fx.user.id).await.unwrap();
        assert_eq!(view.wallet.balance_cents, 1_450);
    }

    #[tokio::test]
    async fn test_cancel_unpaid_and_terminal() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Cash).await;
        let bookings = fx.db.bookings();

        let cancelled = bookings.cancel(&booking.id, &fx.user.id, None).await.unwrap();
        assert_eq!(cancelled.payment_status, PaymentStatus::Pending);

        let err = bookings.cancel(&booking.id, &fx.user.id, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotCancellable { .. })));

        let delivered = fx.book(PaymentMethod::Cash).await;
        fx.deliver(&delivered).await;
        let err = bookings.cancel(&delivered.id, &fx.user.id, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotCancellable { .. })));
    }

    #[tokio::test]
    async fn test_cancel_by_other_user_is_forbidden() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Cash).await;

        let err = fx
            .db
            .bookings()
            .cancel(&booking.id, &fx.other.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let fx = fixture().await;
        let first = fx.book(PaymentMethod::Cash).await;
        fx.book(PaymentMethod::Cash).await;
        fx.book_for(&fx.other.id, PaymentMethod::Cash).await;
        fx.db.bookings().cancel(&first.id, &fx.user.id, None).await.unwrap();

        let all = fx.db.bookings().list(&fx.user.id, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let cancelled = fx
            .db
            .bookings()
            .list(&fx.user.id, Some(BookingStatus::Cancelled))
            .await
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].booking.id, first.id);
    }

    #[tokio::test]
    async fn test_eta_projection() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Cash).await;
        let bookings = fx.db.bookings();

        let eta = bookings.eta(&booking.id, &fx.user.id).await.unwrap();
        assert_eq!(eta.projection.status, BookingStatus::Pending);
        assert_eq!(eta.projection.eta_minutes, Some(25));
        assert!(eta.driver.is_none());

        let mut update = assign(&fx.driver.id);
        update.eta = None;
        bookings.update_status(&booking.id, &fx.user.id, update).await.unwrap();

        let eta = bookings.eta(&booking.id, &fx.driver_user.id).await.unwrap();
        assert_eq!(eta.projection.eta_minutes, Some(10));
        assert_eq!(eta.driver.unwrap().id, fx.driver.id);

        assert!(bookings.eta(&booking.id, &fx.other.id).await.is_err());
    }
}
