//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use courier_core::{Money, Policy, TaxRate};
use courier_db::DbConfig;

/// API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// JWT secret key for verifying tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Invoice tax rate in basis points (600 = 6%)
    pub tax_rate_bps: u32,

    /// Invoice currency code
    pub currency: String,

    /// Paid to referrer and referee each
    pub referral_reward_cents: i64,

    /// Largest single top-up
    pub max_top_up_cents: i64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ApiConfig {
            http_port: parse_var("HTTP_PORT", 8080)?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./courier.db".to_string()),

            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,

            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    // Development only; production deployments set JWT_SECRET
                    "courier-dev-secret-change-in-production".to_string()
                }),

            jwt_access_lifetime_secs: parse_var("JWT_ACCESS_LIFETIME_SECS", 3600)?, // 1 hour

            tax_rate_bps: parse_var("TAX_RATE_BPS", 600)?,

            currency: env::var("CURRENCY").unwrap_or_else(|_| "MYR".to_string()),

            referral_reward_cents: parse_var("REFERRAL_REWARD_CENTS", 500)?,

            max_top_up_cents: parse_var("MAX_TOP_UP_CENTS", 100_000)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if self.tax_rate_bps > 10_000 {
            return Err(ConfigError::InvalidValue("TAX_RATE_BPS".to_string()));
        }
        if self.referral_reward_cents < 0 {
            return Err(ConfigError::InvalidValue("REFERRAL_REWARD_CENTS".to_string()));
        }
        if self.max_top_up_cents <= 0 {
            return Err(ConfigError::InvalidValue("MAX_TOP_UP_CENTS".to_string()));
        }
        if self.currency.trim().is_empty() {
            return Err(ConfigError::InvalidValue("CURRENCY".to_string()));
        }
        Ok(())
    }

    /// Business parameters handed to the store.
    pub fn policy(&self) -> Policy {
        Policy {
            tax_rate: TaxRate::from_bps(self.tax_rate_bps),
            currency: self.currency.trim().to_uppercase(),
            referral_reward: Money::from_cents(self.referral_reward_cents),
            max_top_up: Money::from_cents(self.max_top_up_cents),
        }
    }

    /// Pool settings for the store.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.db_max_connections)
            .busy_timeout(Duration::from_secs(5))
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
