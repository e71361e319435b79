//! # Wallet Repository
//!
//! Stored-value accounts: balance view, top-ups and paying a booking from
//! the wallet. All balance movement goes through [`ledger`](super::ledger).

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use courier_core::booking::{check_payable, ensure_requester};
use courier_core::validation::validate_top_up;
use courier_core::{
    Booking, Money, PaymentMethod, PaymentStatus, TransactionKind, Wallet, WalletTransaction,
};

use super::ledger::{self, Posting};
use super::{fetch_booking, touch_booking};
use crate::error::DbResult;

/// Number of transactions shown with the balance.
pub const RECENT_TRANSACTIONS: i64 = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    pub wallet: Wallet,
    pub recent_transactions: Vec<WalletTransaction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletPayment {
    pub balance_cents: i64,
    pub amount_paid_cents: i64,
    pub booking: Booking,
}

/// Audit view of one wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub balance_cents: i64,
    pub ledger_sum_cents: i64,
}

impl Reconciliation {
    pub fn is_balanced(&self) -> bool {
        self.balance_cents == self.ledger_sum_cents
    }
}

#[derive(Debug, Clone)]
pub struct WalletRepository {
    pool: SqlitePool,
    max_top_up: Money,
}

impl WalletRepository {
    pub fn new(pool: SqlitePool, max_top_up: Money) -> Self {
        WalletRepository { pool, max_top_up }
    }

    /// The caller's wallet, created empty on first access, with the most
    /// recent transactions.
    pub async fn view(&self, user_id: &str) -> DbResult<WalletView> {
        let mut tx = self.pool.begin().await?;
        let wallet = ledger::ensure_wallet(&mut tx, user_id, Utc::now()).await?;
        let recent_transactions = recent(&mut tx, &wallet.id).await?;
        tx.commit().await?;

        debug!(user_id = %user_id, balance_cents = wallet.balance_cents, "Wallet loaded");
        Ok(WalletView {
            wallet,
            recent_transactions,
        })
    }

    /// Credits `amount` as a TOP_UP.
    pub async fn top_up(&self, user_id: &str, amount: Money) -> DbResult<WalletView> {
        validate_top_up(amount, self.max_top_up)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let (wallet, _) = ledger::credit(
            &mut tx,
            Posting {
                user_id,
                amount,
                kind: TransactionKind::TopUp,
                description: "Wallet top-up",
                reference_id: None,
            },
            now,
        )
        .await?;
        let recent_transactions = recent(&mut tx, &wallet.id).await?;
        tx.commit().await?;

        info!(
            user_id = %user_id,
            amount_cents = amount.cents(),
            balance_cents = wallet.balance_cents,
            "Wallet topped up"
        );
        Ok(WalletView {
            wallet,
            recent_transactions,
        })
    }

    /// Pays the booking's working price from the requester's wallet.
    ///
    /// ## Atomic unit
    /// ```text
    /// touch booking → check payable → debit wallet (PAYMENT, ref booking)
    ///              → booking: method WALLET, status COMPLETED, final price
    /// ```
    pub async fn pay_booking(&self, booking_id: &str, user_id: &str) -> DbResult<WalletPayment> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        touch_booking(&mut tx, booking_id, now).await?;
        let booking = fetch_booking(&mut tx, booking_id).await?;
        ensure_requester(&booking, user_id)?;
        let amount = check_payable(&booking)?;

        // A fully discounted booking has nothing to debit.
        let balance_cents = if amount.is_positive() {
            let (wallet, _) = ledger::debit(
                &mut tx,
                Posting {
                    user_id,
                    amount,
                    kind: TransactionKind::Payment,
                    description: "Booking payment",
                    reference_id: Some(booking_id),
                },
                now,
            )
            .await?;
            wallet.balance_cents
        } else {
            ledger::ensure_wallet(&mut tx, user_id, now).await?.balance_cents
        };

        sqlx::query(
            r#"
            UPDATE bookings SET
                payment_method = ?2,
                payment_status = ?3,
                final_price_cents = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(booking_id)
        .bind(PaymentMethod::Wallet)
        .bind(PaymentStatus::Completed)
        .bind(amount.cents())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let booking = fetch_booking(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(
            booking_id = %booking_id,
            amount_cents = amount.cents(),
            "Booking paid from wallet"
        );
        Ok(WalletPayment {
            balance_cents,
            amount_paid_cents: amount.cents(),
            booking,
        })
    }

    /// Compares the stored balance with the sum of the ledger.
    pub async fn reconcile(&self, user_id: &str) -> DbResult<Reconciliation> {
        let mut tx = self.pool.begin().await?;
        let wallet = ledger::ensure_wallet(&mut tx, user_id, Utc::now()).await?;
        let (balance, sum) = ledger::reconcile(&mut tx, &wallet.id).await?;
        tx.commit().await?;

        Ok(Reconciliation {
            balance_cents: balance.cents(),
            ledger_sum_cents: sum.cents(),
        })
    }
}

async fn recent(
    conn: &mut sqlx::SqliteConnection,
    wallet_id: &str,
) -> DbResult<Vec<WalletTransaction>> {
    let rows = sqlx::query_as::<_, WalletTransaction>(
        r#"
        SELECT * FROM wallet_transactions
        WHERE wallet_id = ?1
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?2
        "#,
    )
    .bind(wallet_id)
    .bind(RECENT_TRANSACTIONS)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::testing::fixture;
    use courier_core::CoreError;

    #[tokio::test]
    async fn test_view_creates_empty_wallet() {
        let fx = fixture().await;
        let view = fx.db.wallets().view(&fx.user.id).await.unwrap();

        assert_eq!(view.wallet.balance_cents, 0);
        assert!(view.recent_transactions.is_empty());
    }

    #[tokio::test]
    async fn test_top_up_limits() {
        let fx = fixture().await;
        let wallets = fx.db.wallets();

        let view = wallets.top_up(&fx.user.id, Money::from_cents(5_000)).await.unwrap();
        assert_eq!(view.wallet.balance_cents, 5_000);
        assert_eq!(view.recent_transactions.len(), 1);
        assert_eq!(view.recent_transactions[0].kind, TransactionKind::TopUp);

        assert!(wallets.top_up(&fx.user.id, Money::zero()).await.is_err());
        assert!(wallets
            .top_up(&fx.user.id, Money::from_cents(100_001))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_pay_booking_debits_working_price() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Cash).await;
        fx.fund(&fx.user.id, 2_000).await;

        let paid = fx.db.wallets().pay_booking(&booking.id, &fx.user.id).await.unwrap();

        assert_eq!(paid.amount_paid_cents, 1_450);
        assert_eq!(paid.balance_cents, 550);
        assert_eq!(paid.booking.payment_method, PaymentMethod::Wallet);
        assert_eq!(paid.booking.payment_status, PaymentStatus::Completed);
        assert_eq!(paid.booking.final_price_cents, Some(1_450));
        assert!(fx.db.wallets().reconcile(&fx.user.id).await.unwrap().is_balanced());
    }

    #[tokio::test]
    async fn test_pay_booking_twice_fails() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Wallet).await;
        fx.fund(&fx.user.id, 5_000).await;

        fx.db.wallets().pay_booking(&booking.id, &fx.user.id).await.unwrap();
        let err = fx.db.wallets().pay_booking(&booking.id, &fx.user.id).await.unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::AlreadyPaid(_))));
    }

    #[tokio::test]
    async fn test_pay_booking_insufficient_funds_changes_nothing() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Wallet).await;
        fx.fund(&fx.user.id, 1_000).await;

        let err = fx.db.wallets().pay_booking(&booking.id, &fx.user.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientFunds { .. })
        ));

        let view = fx.db.wallets().view(&fx.user.id).await.unwrap();
        assert_eq!(view.wallet.balance_cents, 1_000);
        let details = fx.db.bookings().get(&booking.id, &fx.user.id).await.unwrap();
        assert_eq!(details.booking.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_pay_booking_of_someone_else_is_forbidden() {
        let fx = fixture().await;
        let booking = fx.book(PaymentMethod::Wallet).await;
        fx.fund(&fx.other.id, 5_000).await;

        let err = fx.db.wallets().pay_booking(&booking.id, &fx.other.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden { .. })));
    }
}
