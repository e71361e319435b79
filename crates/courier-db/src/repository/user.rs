//! # User Repository
//!
//! Users are issued by the identity provider; this store only keeps what the
//! booking core needs: a display name, a phone and the referral code.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use courier_core::validation::{validate_optional_text, validate_text};
use courier_core::User;

use super::new_id;
use crate::error::{DbError, DbResult};

/// Attempts at drawing an unused referral code.
const REFERRAL_CODE_ATTEMPTS: usize = 3;

/// Repository for user records.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a user with a fresh referral code.
    pub async fn create(&self, name: &str, phone: Option<&str>) -> DbResult<User> {
        let name = validate_text("name", name, 100)?;
        let phone = validate_optional_text("phone", phone, 32)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let user = User {
                id: new_id(),
                name: name.clone(),
                phone: phone.clone(),
                referral_code: generate_referral_code(),
                created_at: Utc::now(),
            };

            let inserted = sqlx::query(
                r#"
                INSERT INTO users (id, name, phone, referral_code, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.phone)
            .bind(&user.referral_code)
            .bind(user.created_at)
            .execute(&self.pool)
            .await;

            match inserted {
                Ok(_) => {
                    debug!(user_id = %user.id, "User created");
                    return Ok(user);
                }
                Err(e) => {
                    let err = DbError::from(e);
                    if attempt < REFERRAL_CODE_ATTEMPTS
                        && err.is_unique_violation_on("users.referral_code")
                    {
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_referral_code(&self, code: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE referral_code = ?1")
            .bind(code.trim().to_uppercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

/// Eight uppercase hex characters.
pub fn generate_referral_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_find_by_referral_code() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().create("  Aisyah ", None).await.unwrap();

        assert_eq!(user.name, "Aisyah");
        assert_eq!(user.referral_code.len(), 8);

        let found = db
            .users()
            .find_by_referral_code(&user.referral_code.to_lowercase())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.users().create("  ", None).await.is_err());
    }

    #[test]
    fn test_referral_code_shape() {
        let code = generate_referral_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
