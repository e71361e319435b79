//! # Referral Repository
//!
//! A referral links an inviting user (referrer) to an invited one (referee).
//! Applying a code pays a fixed reward to both wallets in one transaction;
//! each user can be a referee at most once.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use courier_core::{
    CoreError, Money, Referral, ReferralStatus, TransactionKind, User, ValidationError,
};

use super::ledger::{self, Posting};
use super::new_id;
use crate::error::DbResult;

/// The caller's referral standing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralInfo {
    pub referral_code: String,
    /// Users who signed up with the caller's code.
    pub referred_count: i64,
    /// Rewards earned as referrer.
    pub total_earned_cents: i64,
    pub was_referred: bool,
}

#[derive(Debug, Clone)]
pub struct ReferralRepository {
    pool: SqlitePool,
    reward: Money,
}

impl ReferralRepository {
    pub fn new(pool: SqlitePool, reward: Money) -> Self {
        ReferralRepository { pool, reward }
    }

    pub async fn info(&self, user_id: &str) -> DbResult<ReferralInfo> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::not_found("User", user_id))?;

        let (referred_count, total_earned_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(reward_cents), 0)
            FROM referrals
            WHERE referrer_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let was_referred: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM referrals WHERE referee_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(ReferralInfo {
            referral_code: user.referral_code,
            referred_count,
            total_earned_cents,
            was_referred: was_referred.is_some(),
        })
    }

    /// Redeems `code` for `referee_id`, crediting both wallets.
    pub async fn apply(&self, code: &str, referee_id: &str) -> DbResult<Referral> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err(ValidationError::Required {
                field: "referralCode".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Opens the write lock before anything is decided.
        ledger::ensure_wallet(&mut tx, referee_id, now).await?;

        let referrer = sqlx::query_as::<_, User>("SELECT * FROM users WHERE referral_code = ?1")
            .bind(&code)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::InvalidReferralCode(code.clone()))?;

        if referrer.id == referee_id {
            return Err(CoreError::SelfReferral.into());
        }

        let prior: Option<i64> = sqlx::query_scalar("SELECT 1 FROM referrals WHERE referee_id = ?1")
            .bind(referee_id)
            .fetch_optional(&mut *tx)
            .await?;
        if prior.is_some() {
            return Err(CoreError::AlreadyReferred.into());
        }

        let referral = Referral {
            id: new_id(),
            referrer_id: referrer.id.clone(),
            referee_id: referee_id.to_string(),
            code,
            reward_cents: self.reward.cents(),
            status: ReferralStatus::Completed,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO referrals (id, referrer_id, referee_id, code, reward_cents, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&referral.id)
        .bind(&referral.referrer_id)
        .bind(&referral.referee_id)
        .bind(&referral.code)
        .bind(referral.reward_cents)
        .bind(referral.status)
        .bind(referral.created_at)
        .execute(&mut *tx)
        .await?;

        if self.reward.is_positive() {
            for (user_id, description) in [
                (referral.referrer_id.as_str(), "Referral reward"),
                (referral.referee_id.as_str(), "Welcome bonus for using a referral code"),
            ] {
                ledger::credit(
                    &mut tx,
                    Posting {
                        user_id,
                        amount: self.reward,
                        kind: TransactionKind::ReferralBonus,
                        description,
                        reference_id: Some(&referral.id),
                    },
                    now,
                )
                .await?;
            }
        }

        tx.commit().await?;

        info!(
            referrer_id = %referral.referrer_id,
            referee_id = %referral.referee_id,
            reward_cents = referral.reward_cents,
            "Referral applied"
        );
        Ok(referral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::testing::fixture;

    #[tokio::test]
    async fn test_apply_credits_both_wallets() {
        let fx = fixture().await;
        let referrals = fx.db.referrals();

        let referral = referrals
            .apply(&fx.user.referral_code.to_lowercase(), &fx.other.id)
            .await
            .unwrap();
        assert_eq!(referral.status, ReferralStatus::Completed);
        assert_eq!(referral.reward_cents, 500);

        for user_id in [&fx.user.id, &fx.other.id] {
            let view = fx.db.wallets().view(user_id).await.unwrap();
            assert_eq!(view.wallet.balance_cents, 500);
            assert_eq!(view.recent_transactions.len(), 1);
            assert_eq!(
                view.recent_transactions[0].kind,
                TransactionKind::ReferralBonus
            );
        }

        let info = referrals.info(&fx.user.id).await.unwrap();
        assert_eq!(info.referred_count, 1);
        assert_eq!(info.total_earned_cents, 500);
        assert!(!info.was_referred);
        assert!(referrals.info(&fx.other.id).await.unwrap().was_referred);
    }

    #[tokio::test]
    async fn test_second_referral_is_refused() {
        let fx = fixture().await;
        let referrals = fx.db.referrals();

        referrals.apply(&fx.user.referral_code, &fx.other.id).await.unwrap();
        let err = referrals
            .apply(&fx.driver_user.referral_code, &fx.other.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::AlreadyReferred)));

        let view = fx.db.wallets().view(&fx.other.id).await.unwrap();
        assert_eq!(view.wallet.balance_cents, 500);
        let view = fx.db.wallets().view(&fx.driver_user.id).await.unwrap();
        assert_eq!(view.wallet.balance_cents, 0);
    }

    #[tokio::test]
    async fn test_self_and_unknown_codes() {
        let fx = fixture().await;
        let referrals = fx.db.referrals();

        let err = referrals.apply(&fx.user.referral_code, &fx.user.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SelfReferral)));

        let err = referrals.apply("ZZZZZZZZ", &fx.user.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidReferralCode(_))
        ));
    }
}
