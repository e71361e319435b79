//! # Rating Repository
//!
//! Ratings, reviews and tips on delivered bookings, plus the per-driver
//! aggregate.
//!
//! ```text
//! submit(booking, 1..=5, review?, tags?, tip?)      one transaction
//!   ├── booking must be DELIVERED and belong to the caller
//!   ├── upsert order (rating, review, tags)
//!   ├── driver.rating = mean of all rated deliveries, 1 decimal
//!   └── tip > 0 and wallet covers it → debit PAYMENT, order.tip_cents
//!       otherwise the tip is skipped and the rating still lands
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use courier_core::booking::ensure_requester;
use courier_core::rating::{mean_rating, normalize_tags, validate_rating};
use courier_core::validation::{validate_review, validate_tip};
use courier_core::{BookingStatus, CoreError, Driver, Money, Order, TransactionKind};

use super::ledger::{self, Posting};
use super::{fetch_booking, new_id, touch_booking};
use crate::error::{DbError, DbResult};

/// Reviews shown with a driver summary.
pub const RECENT_REVIEWS: i64 = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSubmission {
    pub rating: i64,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tip_amount_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingOutcome {
    pub order: Order,
    /// Driver's new mean, when the booking had a driver.
    pub driver_rating: Option<f64>,
    pub tip_transferred: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub booking_id: String,
    pub rating: i64,
    pub review: Option<String>,
    #[sqlx(json)]
    pub tags: Vec<String>,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRatings {
    pub driver: Driver,
    pub rating_count: i64,
    pub recent_reviews: Vec<ReviewEntry>,
}

#[derive(Debug, Clone)]
pub struct RatingRepository {
    pool: SqlitePool,
}

impl RatingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RatingRepository { pool }
    }

    pub async fn submit(
        &self,
        booking_id: &str,
        user_id: &str,
        submission: RatingSubmission,
    ) -> DbResult<RatingOutcome> {
        validate_rating(submission.rating)?;
        let review = validate_review(submission.review.as_deref())?;
        let tags = normalize_tags(&submission.tags)?;
        let tip = Money::from_cents(submission.tip_amount_cents.unwrap_or(0));
        validate_tip(tip)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        touch_booking(&mut tx, booking_id, now).await?;
        let booking = fetch_booking(&mut tx, booking_id).await?;
        ensure_requester(&booking, user_id)?;
        if booking.status != BookingStatus::Delivered {
            return Err(CoreError::NotDelivered(booking.id.clone()).into());
        }

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, booking_id, user_id, driver_id, rating, review, tags,
                tip_cents, completed_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)
            ON CONFLICT(booking_id) DO UPDATE SET
                rating = excluded.rating,
                review = excluded.review,
                tags = excluded.tags,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(new_id())
        .bind(&booking.id)
        .bind(&booking.user_id)
        .bind(&booking.driver_id)
        .bind(submission.rating)
        .bind(&review)
        .bind(serde_json::to_string(&tags)?)
        .bind(booking.delivered_at.unwrap_or(now))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let driver_rating = match booking.driver_id.as_deref() {
            Some(driver_id) => {
                let (sum, count): (i64, i64) = sqlx::query_as(
                    r#"
                    SELECT COALESCE(SUM(o.rating), 0), COUNT(o.rating)
                    FROM orders o
                    JOIN bookings b ON b.id = o.booking_id
                    WHERE b.driver_id = ?1 AND b.status = ?2 AND o.rating IS NOT NULL
                    "#,
                )
                .bind(driver_id)
                .bind(BookingStatus::Delivered)
                .fetch_one(&mut *tx)
                .await?;

                let mean = mean_rating(sum, count);
                sqlx::query("UPDATE drivers SET rating = ?2 WHERE id = ?1")
                    .bind(driver_id)
                    .bind(mean)
                    .execute(&mut *tx)
                    .await?;
                Some(mean)
            }
            None => None,
        };

        let already_tipped: i64 =
            sqlx::query_scalar("SELECT tip_cents FROM orders WHERE booking_id = ?1")
                .bind(&booking.id)
                .fetch_one(&mut *tx)
                .await?;

        let mut tip_transferred = false;
        if tip.is_positive() && already_tipped > 0 {
            warn!(booking_id = %booking.id, "Tip already recorded, skipping");
        } else if tip.is_positive() {
            let debit = ledger::debit(
                &mut tx,
                Posting {
                    user_id,
                    amount: tip,
                    kind: TransactionKind::Payment,
                    description: "Tip for driver",
                    reference_id: Some(&booking.id),
                },
                now,
            )
            .await;

            match debit {
                Ok(_) => {
                    sqlx::query("UPDATE orders SET tip_cents = ?2 WHERE booking_id = ?1")
                        .bind(&booking.id)
                        .bind(tip.cents())
                        .execute(&mut *tx)
                        .await?;
                    tip_transferred = true;
                }
                // The guarded debit wrote nothing; the rating still commits.
                Err(DbError::Domain(CoreError::InsufficientFunds { available, .. })) => {
                    warn!(
                        booking_id = %booking.id,
                        tip_cents = tip.cents(),
                        available_cents = available.cents(),
                        "Insufficient balance for tip, skipping transfer"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE booking_id = ?1")
            .bind(&booking.id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            booking_id = %booking.id,
            rating = submission.rating,
            tip_transferred,
            "Rating submitted"
        );
        Ok(RatingOutcome {
            order,
            driver_rating,
            tip_transferred,
        })
    }

    /// Driver profile with rating count and the latest reviews.
    pub async fn driver_summary(&self, driver_id: &str) -> DbResult<DriverRatings> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = ?1")
            .bind(driver_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::not_found("Driver", driver_id))?;

        let rating_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(o.rating)
            FROM orders o
            JOIN bookings b ON b.id = o.booking_id
            WHERE b.driver_id = ?1 AND b.status = ?2 AND o.rating IS NOT NULL
            "#,
        )
        .bind(driver_id)
        .bind(BookingStatus::Delivered)
        .fetch_one(&self.pool)
        .await?;

        let recent_reviews = sqlx::query_as::<_, ReviewEntry>(
            r#"
            SELECT o.booking_id, o.rating, o.review, o.tags, o.updated_at AS rated_at
            FROM orders o
            JOIN bookings b ON b.id = o.booking_id
            WHERE b.driver_id = ?1 AND o.rating IS NOT NULL
            ORDER BY o.updated_at DESC
            LIMIT ?2
            "#,
        )
        .bind(driver_id)
        .bind(RECENT_REVIEWS)
        .fetch_all(&self.pool)
        .await?;

        debug!(driver_id = %driver_id, rating_count, "Driver ratings loaded");
        Ok(DriverRatings {
            driver,
            rating_count,
            recent_reviews,
        })
    }
}
