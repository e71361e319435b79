//! # Driver Repository
//!
//! Driver profiles. `rating` and `total_trips` are maintained by the booking
//! and rating repositories; nothing else writes them.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;

use courier_core::validation::validate_text;
use courier_core::{CoreError, Driver};

use super::new_id;
use crate::error::DbResult;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDriver {
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    pub phone: String,
    pub vehicle_type: String,
    pub vehicle_number: String,
}

#[derive(Debug, Clone)]
pub struct DriverRepository {
    pool: SqlitePool,
}

impl DriverRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DriverRepository { pool }
    }

    pub async fn create(&self, driver: &NewDriver) -> DbResult<Driver> {
        let row = Driver {
            id: new_id(),
            user_id: driver.user_id.clone(),
            name: validate_text("name", &driver.name, 100)?,
            phone: validate_text("phone", &driver.phone, 32)?,
            vehicle_type: validate_text("vehicleType", &driver.vehicle_type, 32)?,
            vehicle_number: validate_text("vehicleNumber", &driver.vehicle_number, 32)?,
            rating: 0.0,
            total_trips: 0,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO drivers (
                id, user_id, name, phone, vehicle_type, vehicle_number,
                rating, total_trips, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&row.id)
        .bind(&row.user_id)
        .bind(&row.name)
        .bind(&row.phone)
        .bind(&row.vehicle_type)
        .bind(&row.vehicle_number)
        .bind(row.rating)
        .bind(row.total_trips)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        debug!(driver_id = %row.id, "Driver created");
        Ok(row)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Driver>> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(driver)
    }

    /// Like [`get_by_id`](Self::get_by_id) but a missing driver is an error.
    pub async fn require(&self, id: &str) -> DbResult<Driver> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Driver", id).into())
    }

    pub async fn find_by_user(&self, user_id: &str) -> DbResult<Option<Driver>> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(driver)
    }
}
