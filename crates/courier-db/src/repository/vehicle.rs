//! # Vehicle Repository
//!
//! Vehicle classes and their fare tables. Public reference data.

use sqlx::SqlitePool;
use tracing::debug;

use courier_core::VehicleType;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct VehicleRepository {
    pool: SqlitePool,
}

impl VehicleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VehicleRepository { pool }
    }

    /// All vehicle classes, cheapest first.
    pub async fn list(&self) -> DbResult<Vec<VehicleType>> {
        let vehicles = sqlx::query_as::<_, VehicleType>(
            "SELECT * FROM vehicle_types ORDER BY base_fare_cents, code",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(vehicles)
    }

    pub async fn get(&self, code: &str) -> DbResult<Option<VehicleType>> {
        let vehicle = sqlx::query_as::<_, VehicleType>("SELECT * FROM vehicle_types WHERE code = ?1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle)
    }

    /// Inserts or replaces the fare table of a vehicle class.
    pub async fn upsert(&self, vehicle: &VehicleType) -> DbResult<()> {
        debug!(code = %vehicle.code, "Upserting vehicle type");

        sqlx::query(
            r#"
            INSERT INTO vehicle_types (code, name, capacity_kg, base_fare_cents, per_km_cents)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(code) DO UPDATE SET
                name = excluded.name,
                capacity_kg = excluded.capacity_kg,
                base_fare_cents = excluded.base_fare_cents,
                per_km_cents = excluded.per_km_cents
            "#,
        )
        .bind(&vehicle.code)
        .bind(&vehicle.name)
        .bind(vehicle.capacity_kg)
        .bind(vehicle.base_fare_cents)
        .bind(vehicle.per_km_cents)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::testing::fixture;
    use courier_core::VehicleType;

    #[tokio::test]
    async fn test_upsert_replaces_fares() {
        let fx = fixture().await;
        fx.db
            .vehicles()
            .upsert(&VehicleType {
                code: "bike".into(),
                name: "Motorbike".into(),
                capacity_kg: 20,
                base_fare_cents: 600,
                per_km_cents: 120,
            })
            .await
            .unwrap();

        let vehicles = fx.db.vehicles().list().await.unwrap();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].base_fare_cents, 600);
        assert!(fx.db.vehicles().get("lorry").await.unwrap().is_none());
    }
}
