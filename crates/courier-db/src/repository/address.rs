//! # Address Repository
//!
//! Saved pickup and delivery locations. An address belongs to exactly one
//! user and is never shared across accounts.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};

use courier_core::validation::{validate_coordinates, validate_optional_text, validate_text};
use courier_core::{Address, ValidationError};

use super::new_id;
use crate::error::DbResult;

/// Address payload, either saved on its own or inline with a booking.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    #[serde(default)]
    pub label: Option<String>,
    pub line1: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

impl NewAddress {
    /// Trims and checks every field, returning the cleaned copy.
    pub fn validated(&self) -> Result<NewAddress, ValidationError> {
        validate_coordinates(self.latitude, self.longitude)?;
        Ok(NewAddress {
            label: validate_optional_text("label", self.label.as_deref(), 50)?,
            line1: validate_text("line1", &self.line1, 200)?,
            city: validate_text("city", &self.city, 100)?,
            latitude: self.latitude,
            longitude: self.longitude,
            contact_name: validate_optional_text("contactName", self.contact_name.as_deref(), 100)?,
            contact_phone: validate_optional_text(
                "contactPhone",
                self.contact_phone.as_deref(),
                32,
            )?,
        })
    }
}

/// Repository for saved addresses.
#[derive(Debug, Clone)]
pub struct AddressRepository {
    pool: SqlitePool,
}

impl AddressRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AddressRepository { pool }
    }

    pub async fn create(&self, user_id: &str, address: &NewAddress) -> DbResult<Address> {
        let address = address.validated()?;
        let mut conn = self.pool.acquire().await?;
        insert_address(&mut conn, user_id, &address, Utc::now()).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Address>> {
        let address = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(address)
    }

    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Address>> {
        let addresses = sqlx::query_as::<_, Address>(
            "SELECT * FROM addresses WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(addresses)
    }
}

/// Inserts an already validated address on the given connection.
pub(crate) async fn insert_address(
    conn: &mut SqliteConnection,
    user_id: &str,
    address: &NewAddress,
    now: DateTime<Utc>,
) -> DbResult<Address> {
    let row = Address {
        id: new_id(),
        user_id: user_id.to_string(),
        label: address.label.clone(),
        line1: address.line1.clone(),
        city: address.city.clone(),
        latitude: address.latitude,
        longitude: address.longitude,
        contact_name: address.contact_name.clone(),
        contact_phone: address.contact_phone.clone(),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO addresses (
            id, user_id, label, line1, city, latitude, longitude,
            contact_name, contact_phone, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&row.id)
    .bind(&row.user_id)
    .bind(&row.label)
    .bind(&row.line1)
    .bind(&row.city)
    .bind(row.latitude)
    .bind(row.longitude)
    .bind(&row.contact_name)
    .bind(&row.contact_phone)
    .bind(row.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(row)
}
