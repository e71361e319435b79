//! # Ledger Store
//!
//! The only code that changes a wallet balance.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Posting                                  │
//! │                                                                         │
//! │  credit(user, +amount)            debit(user, amount)                  │
//! │       │                                │                                │
//! │       ▼                                ▼                                │
//! │  ensure_wallet (INSERT … ON CONFLICT DO NOTHING)                       │
//! │       │                                │                                │
//! │       ▼                                ▼                                │
//! │  UPDATE wallets                   UPDATE wallets                       │
//! │  SET balance += amount            SET balance -= amount                │
//! │                                   WHERE balance >= amount  ◄─ guard    │
//! │       │                                │ 0 rows → InsufficientFunds    │
//! │       ▼                                ▼                                │
//! │  INSERT wallet_transactions (+amount / −amount)                        │
//! │                                                                         │
//! │  Invariant: balance == SUM(wallet_transactions.amount_cents)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function runs on a caller-supplied connection so that a posting
//! joins the caller's transaction. Never call these on a bare pool
//! connection for a multi-step event.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use courier_core::{CoreError, Money, TransactionKind, ValidationError, Wallet, WalletTransaction};

use super::new_id;
use crate::error::DbResult;

/// One side of a ledger posting.
#[derive(Debug, Clone)]
pub struct Posting<'a> {
    pub user_id: &'a str,
    /// Always positive; direction comes from credit/debit.
    pub amount: Money,
    pub kind: TransactionKind,
    pub description: &'a str,
    pub reference_id: Option<&'a str>,
}

/// Locates the user's wallet, creating an empty one on first use.
pub async fn ensure_wallet(
    conn: &mut SqliteConnection,
    user_id: &str,
    now: DateTime<Utc>,
) -> DbResult<Wallet> {
    sqlx::query(
        r#"
        INSERT INTO wallets (id, user_id, balance_cents, created_at, updated_at)
        VALUES (?1, ?2, 0, ?3, ?3)
        ON CONFLICT(user_id) DO NOTHING
        "#,
    )
    .bind(new_id())
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = ?1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(wallet)
}

/// Adds `posting.amount` to the wallet and appends the matching entry.
pub async fn credit(
    conn: &mut SqliteConnection,
    posting: Posting<'_>,
    now: DateTime<Utc>,
) -> DbResult<(Wallet, WalletTransaction)> {
    ensure_positive(posting.amount)?;
    let wallet = ensure_wallet(conn, posting.user_id, now).await?;

    sqlx::query(
        r#"
        UPDATE wallets
        SET balance_cents = balance_cents + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(&wallet.id)
    .bind(posting.amount.cents())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    append(conn, &wallet.id, posting.amount, &posting, now).await
}

/// Removes `posting.amount` from the wallet, refusing to go negative.
pub async fn debit(
    conn: &mut SqliteConnection,
    posting: Posting<'_>,
    now: DateTime<Utc>,
) -> DbResult<(Wallet, WalletTransaction)> {
    ensure_positive(posting.amount)?;
    let wallet = ensure_wallet(conn, posting.user_id, now).await?;

    let result = sqlx::query(
        r#"
        UPDATE wallets
        SET balance_cents = balance_cents - ?2, updated_at = ?3
        WHERE id = ?1 AND balance_cents >= ?2
        "#,
    )
    .bind(&wallet.id)
    .bind(posting.amount.cents())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::InsufficientFunds {
            available: wallet.balance(),
            required: posting.amount,
        }
        .into());
    }

    append(conn, &wallet.id, -posting.amount, &posting, now).await
}

async fn append(
    conn: &mut SqliteConnection,
    wallet_id: &str,
    signed_amount: Money,
    posting: &Posting<'_>,
    now: DateTime<Utc>,
) -> DbResult<(Wallet, WalletTransaction)> {
    let entry = WalletTransaction {
        id: new_id(),
        wallet_id: wallet_id.to_string(),
        amount_cents: signed_amount.cents(),
        kind: posting.kind,
        description: posting.description.to_string(),
        reference_id: posting.reference_id.map(str::to_string),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO wallet_transactions (
            id, wallet_id, amount_cents, kind, description, reference_id, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.wallet_id)
    .bind(entry.amount_cents)
    .bind(entry.kind)
    .bind(&entry.description)
    .bind(&entry.reference_id)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE id = ?1")
        .bind(wallet_id)
        .fetch_one(&mut *conn)
        .await?;

    debug!(
        wallet_id = %wallet_id,
        amount_cents = entry.amount_cents,
        kind = ?entry.kind,
        balance_cents = wallet.balance_cents,
        "Ledger entry posted"
    );

    Ok((wallet, entry))
}

fn ensure_positive(amount: Money) -> Result<(), ValidationError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        })
    }
}

/// `(balance, sum of entries)` for one wallet.
pub async fn reconcile(conn: &mut SqliteConnection, wallet_id: &str) -> DbResult<(Money, Money)> {
    let (balance, sum): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            w.balance_cents,
            COALESCE((SELECT SUM(t.amount_cents)
                      FROM wallet_transactions t
                      WHERE t.wallet_id = w.id), 0)
        FROM wallets w
        WHERE w.id = ?1
        "#,
    )
    .bind(wallet_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok((Money::from_cents(balance), Money::from_cents(sum)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::testing::fixture;

    fn posting(user_id: &str, cents: i64) -> Posting<'_> {
        Posting {
            user_id,
            amount: Money::from_cents(cents),
            kind: TransactionKind::TopUp,
            description: "test",
            reference_id: None,
        }
    }

    #[tokio::test]
    async fn test_credit_then_debit_keeps_invariant() {
        let fx = fixture().await;
        let mut tx = fx.db.pool().begin().await.unwrap();
        let now = Utc::now();

        let (wallet, entry) = credit(&mut tx, posting(&fx.user.id, 2_000), now).await.unwrap();
        assert_eq!(wallet.balance_cents, 2_000);
        assert_eq!(entry.amount_cents, 2_000);

        let (wallet, entry) = debit(&mut tx, posting(&fx.user.id, 750), now).await.unwrap();
        assert_eq!(wallet.balance_cents, 1_250);
        assert_eq!(entry.amount_cents, -750);

        let (balance, sum) = reconcile(&mut tx, &wallet.id).await.unwrap();
        assert_eq!(balance, sum);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_debit_refuses_overdraft() {
        let fx = fixture().await;
        let mut tx = fx.db.pool().begin().await.unwrap();
        let now = Utc::now();

        credit(&mut tx, posting(&fx.user.id, 100), now).await.unwrap();
        let err = debit(&mut tx, posting(&fx.user.id, 101), now).await.unwrap_err();

        match err {
            DbError::Domain(CoreError::InsufficientFunds {
                available,
                required,
            }) => {
                assert_eq!(available.cents(), 100);
                assert_eq!(required.cents(), 101);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let wallet = ensure_wallet(&mut tx, &fx.user.id, now).await.unwrap();
        assert_eq!(wallet.balance_cents, 100);
    }

    #[tokio::test]
    async fn test_non_positive_amounts_are_rejected() {
        let fx = fixture().await;
        let mut tx = fx.db.pool().begin().await.unwrap();

        assert!(credit(&mut tx, posting(&fx.user.id, 0), Utc::now()).await.is_err());
        assert!(debit(&mut tx, posting(&fx.user.id, -5), Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn test_ensure_wallet_is_idempotent() {
        let fx = fixture().await;
        let mut tx = fx.db.pool().begin().await.unwrap();

        let a = ensure_wallet(&mut tx, &fx.user.id, Utc::now()).await.unwrap();
        let b = ensure_wallet(&mut tx, &fx.user.id, Utc::now()).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.balance_cents, 0);
    }
}
