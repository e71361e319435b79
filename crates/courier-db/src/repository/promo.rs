//! # Promo Repository
//!
//! Coupon lookup, validation and redemption.
//!
//! ## Redemption
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply(code, booking, user)              one transaction               │
//! │                                                                         │
//! │  touch booking ─► load booking ─► requester? discountable?             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load coupon + redemption ─► evaluate (active, expiry, limit, min…)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE coupons SET used_count = used_count + 1                        │
//! │  WHERE id = ? AND used_count < usage_limit   ◄─ 0 rows: limit reached   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  booking.promo_code / discount   +   user_coupons upsert               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `validate` is advisory and read-only; `apply` re-checks everything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use courier_core::booking::{check_discountable, ensure_requester};
use courier_core::promo::{evaluate, validate_code, DiscountQuote};
use courier_core::validation::validate_discount_value;
use courier_core::{Booking, CoreError, Coupon, DiscountType, Money, ValidationError};

use super::{fetch_booking, new_id, touch_booking};
use crate::error::DbResult;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromo {
    #[serde(flatten)]
    pub quote: DiscountQuote,
    pub booking: Booking,
}

/// Coupon definition, used by seeding and tests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoupon {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    #[serde(default)]
    pub max_discount_cents: Option<i64>,
    #[serde(default)]
    pub min_order_cents: i64,
    pub usage_limit: i64,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct PromoRepository {
    pool: SqlitePool,
}

impl PromoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PromoRepository { pool }
    }

    pub async fn create(&self, coupon: &NewCoupon) -> DbResult<Coupon> {
        let code = validate_code(&coupon.code)?;
        validate_discount_value(coupon.discount_type, coupon.discount_value)?;
        if coupon.min_order_cents < 0 {
            return Err(ValidationError::MustBePositive {
                field: "minOrderCents".to_string(),
            }
            .into());
        }
        if coupon.usage_limit < 1 {
            return Err(ValidationError::MustBePositive {
                field: "usageLimit".to_string(),
            }
            .into());
        }

        let row = Coupon {
            id: new_id(),
            code,
            description: coupon.description.clone(),
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value,
            max_discount_cents: coupon.max_discount_cents,
            min_order_cents: coupon.min_order_cents,
            usage_limit: coupon.usage_limit,
            used_count: 0,
            is_active: true,
            expires_at: coupon.expires_at,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, description, discount_type, discount_value,
                max_discount_cents, min_order_cents, usage_limit, used_count,
                is_active, expires_at, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&row.id)
        .bind(&row.code)
        .bind(&row.description)
        .bind(row.discount_type)
        .bind(row.discount_value)
        .bind(row.max_discount_cents)
        .bind(row.min_order_cents)
        .bind(row.usage_limit)
        .bind(row.used_count)
        .bind(row.is_active)
        .bind(row.expires_at)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        debug!(code = %row.code, "Coupon created");
        Ok(row)
    }

    /// Turns a coupon on or off without touching its counters.
    pub async fn set_active(&self, code: &str, active: bool) -> DbResult<()> {
        let code = validate_code(code)?;
        let result = sqlx::query("UPDATE coupons SET is_active = ?2 WHERE code = ?1")
            .bind(&code)
            .bind(active)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::CodeNotFound(code).into());
        }
        Ok(())
    }

    /// Computes the discount `code` would give the caller on `order_amount`.
    pub async fn validate(
        &self,
        code: &str,
        user_id: &str,
        order_amount: Money,
    ) -> DbResult<DiscountQuote> {
        let code = validate_code(code)?;
        if !order_amount.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "orderAmount".to_string(),
            }
            .into());
        }

        let mut conn = self.pool.acquire().await?;
        let coupon = find_coupon(&mut conn, &code).await?;
        let redeemed = is_redeemed(&mut conn, user_id, &coupon.id).await?;

        let quote = evaluate(&coupon, order_amount, redeemed, Utc::now())?;
        debug!(code = %code, discount_cents = quote.discount_cents, "Promo validated");
        Ok(quote)
    }

    /// Attaches `code` to the caller's booking and consumes one use.
    pub async fn apply(&self, code: &str, booking_id: &str, user_id: &str) -> DbResult<AppliedPromo> {
        let code = validate_code(code)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        touch_booking(&mut tx, booking_id, now).await?;
        let booking = fetch_booking(&mut tx, booking_id).await?;
        ensure_requester(&booking, user_id)?;
        let invoiced = has_invoice(&mut tx, booking_id).await?;
        check_discountable(&booking, invoiced)?;

        let coupon = find_coupon(&mut tx, &code).await?;
        let redeemed = is_redeemed(&mut tx, user_id, &coupon.id).await?;
        let quote = evaluate(&coupon, booking.estimated_price(), redeemed, now)?;

        let claimed = sqlx::query(
            r#"
            UPDATE coupons SET used_count = used_count + 1
            WHERE id = ?1 AND used_count < usage_limit
            "#,
        )
        .bind(&coupon.id)
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            return Err(CoreError::UsageLimitReached(code).into());
        }

        sqlx::query(
            r#"
            UPDATE bookings SET promo_code = ?2, discount_cents = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(booking_id)
        .bind(&coupon.code)
        .bind(quote.discount_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO user_coupons (user_id, coupon_id, booking_id, redeemed_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, coupon_id) DO UPDATE SET
                booking_id = excluded.booking_id,
                redeemed_at = excluded.redeemed_at
            "#,
        )
        .bind(user_id)
        .bind(&coupon.id)
        .bind(booking_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let booking = fetch_booking(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(
            code = %code,
            booking_id = %booking_id,
            discount_cents = quote.discount_cents,
            "Promo applied"
        );
        Ok(AppliedPromo { quote, booking })
    }

    /// Active, unexpired, not exhausted coupons the caller hasn't redeemed.
    pub async fn list_available(&self, user_id: &str) -> DbResult<Vec<Coupon>> {
        let now = Utc::now();
        let coupons = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT c.* FROM coupons c
            WHERE c.is_active = 1
              AND c.used_count < c.usage_limit
              AND NOT EXISTS (
                  SELECT 1 FROM user_coupons uc
                  WHERE uc.coupon_id = c.id AND uc.user_id = ?1
              )
            ORDER BY c.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(coupons.into_iter().filter(|c| !c.is_expired(now)).collect())
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = ?1")
            .bind(validate_code(code)?)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }
}

async fn find_coupon(conn: &mut SqliteConnection, code: &str) -> DbResult<Coupon> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = ?1")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::CodeNotFound(code.to_string()).into())
}

async fn is_redeemed(conn: &mut SqliteConnection, user_id: &str, coupon_id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM user_coupons WHERE user_id = ?1 AND coupon_id = ?2",
    )
    .bind(user_id)
    .bind(coupon_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(found.is_some())
}

async fn has_invoice(conn: &mut SqliteConnection, booking_id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM invoices WHERE booking_id = ?1")
        .bind(booking_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}
