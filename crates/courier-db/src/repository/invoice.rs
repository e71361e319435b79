//! # Invoice Repository
//!
//! One tax-inclusive invoice per booking, generated on first request and
//! returned unchanged afterwards.
//!
//! ## Numbering
//! ```text
//! INV-YYYYMMDD-NNNN   (NNNN random)
//!   │
//!   ├── UNIQUE(invoice_number) collision → draw again, up to 5 times
//!   └── UNIQUE(booking_id) conflict      → someone else generated it first,
//!                                          return theirs
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use courier_core::booking::ensure_requester;
use courier_core::invoice::{compute_amounts, invoice_number};
use courier_core::{BookingStatus, CoreError, Invoice, TaxRate, INVOICE_NUMBER_ATTEMPTS};

use super::{fetch_booking, new_id};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
    tax_rate: TaxRate,
    currency: String,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool, tax_rate: TaxRate, currency: String) -> Self {
        InvoiceRepository {
            pool,
            tax_rate,
            currency,
        }
    }

    /// Returns the booking's invoice, generating it on first call.
    pub async fn get_or_generate(&self, booking_id: &str, user_id: &str) -> DbResult<Invoice> {
        let mut conn = self.pool.acquire().await?;
        let booking = fetch_booking(&mut conn, booking_id).await?;
        ensure_requester(&booking, user_id)?;

        if let Some(existing) = find(&mut conn, booking_id).await? {
            debug!(booking_id = %booking_id, "Invoice already exists");
            return Ok(existing);
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(CoreError::NotPayable(booking.id.clone()).into());
        }

        let amounts = compute_amounts(&booking, self.tax_rate);
        let now = Utc::now();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let number = invoice_number(now);

            let inserted = sqlx::query(
                r#"
                INSERT INTO invoices (
                    id, booking_id, invoice_number, subtotal_cents, tax_cents,
                    discount_cents, total_cents, tax_rate_bps, currency, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(booking_id) DO NOTHING
                "#,
            )
            .bind(new_id())
            .bind(booking_id)
            .bind(&number)
            .bind(amounts.subtotal.cents())
            .bind(amounts.tax.cents())
            .bind(amounts.discount.cents())
            .bind(amounts.total.cents())
            .bind(i64::from(self.tax_rate.bps()))
            .bind(&self.currency)
            .bind(now)
            .execute(&mut *conn)
            .await;

            match inserted {
                Ok(_) => break,
                Err(e) => {
                    let err = DbError::from(e);
                    if attempt < INVOICE_NUMBER_ATTEMPTS
                        && err.is_unique_violation_on("invoices.invoice_number")
                    {
                        warn!(invoice_number = %number, attempt, "Invoice number taken, retrying");
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        let invoice = find(&mut conn, booking_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", booking_id))?;

        info!(
            booking_id = %booking_id,
            invoice_number = %invoice.invoice_number,
            total_cents = invoice.total_cents,
            "Invoice generated"
        );
        Ok(invoice)
    }
}

async fn find(conn: &mut SqliteConnection, booking_id: &str) -> DbResult<Option<Invoice>> {
    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE booking_id = ?1")
        .bind(booking_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(invoice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::fixture;
    use courier_core::PaymentMethod;

    #[tokio::test]
    async fn test_generate_is_idempotent() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Cash).await;
        fx.deliver(&booking).await;
        let invoices = fx.db.invoices();

        let first = invoices.get_or_generate(&booking.id, &fx.user.id).await.unwrap();
        let second = invoices.get_or_generate(&booking.id, &fx.user.id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.invoice_number, second.invoice_number);
        assert!(first.invoice_number.starts_with("INV-"));
        assert_eq!(first.currency, "MYR");
        assert_eq!(first.tax_rate_bps, 600);
        // 14.50 inclusive of 6%: 13.68 + 0.82
        assert_eq!(first.total_cents, 1_450);
        assert_eq!(first.subtotal_cents, 1_368);
        assert_eq!(first.tax_cents, 82);

        let details = fx.db.bookings().get(&booking.id, &fx.user.id).await.unwrap();
        assert_eq!(details.invoice.unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_invoice_reflects_discount() {
        let fx = fixture().await;
        fx.db
            .promos()
            .create(&crate::repository::NewCoupon {
                code: "FLAT".into(),
                description: None,
                discount_type: courier_core::DiscountType::Flat,
                discount_value: 390,
                max_discount_cents: None,
                min_order_cents: 0,
                usage_limit: 10,
                expires_at: None,
            })
            .await
            .unwrap();
        let booking = fx.book(PaymentMethod::Cash).await;
        fx.db.promos().apply("FLAT", &booking.id, &fx.user.id).await.unwrap();

        let invoice = fx
            .db
            .invoices()
            .get_or_generate(&booking.id, &fx.user.id)
            .await
            .unwrap();

        // 14.50 - 3.90 = 10.60 → 10.00 + 0.60
        assert_eq!(invoice.discount_cents, 390);
        assert_eq!(invoice.total_cents, 1_060);
        assert_eq!(invoice.subtotal_cents, 1_000);
        assert_eq!(invoice.tax_cents, 60);
    }

    #[tokio::test]
    async fn test_invoice_access_and_cancelled() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Cash).await;

        let err = fx
            .db
            .invoices()
            .get_or_generate(&booking.id, &fx.other.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden { .. })));

        fx.db.bookings().cancel(&booking.id, &fx.user.id, None).await.unwrap();
        let err = fx
            .db
            .invoices()
            .get_or_generate(&booking.id, &fx.user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotPayable(_))));
    }
}
