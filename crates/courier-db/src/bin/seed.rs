//! # Seed Data Generator
//!
//! Populates the database with reference data for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./courier_dev.db
//! cargo run -p courier-db --bin seed
//!
//! # Specify database path
//! cargo run -p courier-db --bin seed -- --db ./data/courier.db
//!
//! # Reference data only, no demo accounts
//! cargo run -p courier-db --bin seed -- --no-demo
//! ```
//!
//! ## Generated Data
//! - Vehicle classes (bike, car, van, lorry) with their fares
//! - Promo codes (percentage and flat)
//! - A demo customer and a demo driver, unless `--no-demo`
//!
//! Vehicles are upserted, so re-running refreshes fares. Promo codes and demo
//! accounts are only created when missing.

use std::env;

use courier_core::{DiscountType, VehicleType};
use courier_db::{Database, DbConfig, NewCoupon, NewDriver};

/// `(code, name, capacity kg, base fare cents, per-km cents)`
const VEHICLES: &[(&str, &str, i64, i64, i64)] = &[
    ("bike", "Motorcycle", 20, 500, 100),
    ("car", "Car", 100, 1_000, 150),
    ("van", "Van", 800, 2_500, 250),
    ("lorry", "1-Tonne Lorry", 1_000, 4_000, 350),
];

/// `(code, description, type, value, cap cents, min order cents, usage limit)`
const PROMOS: &[(&str, &str, DiscountType, i64, Option<i64>, i64, i64)] = &[
    ("WELCOME10", "10% off your delivery", DiscountType::Percentage, 1_000, Some(1_000), 0, 1_000),
    ("FLAT5", "RM5 off orders above RM20", DiscountType::Flat, 500, None, 2_000, 500),
    ("BIGVAN", "15% off van bookings", DiscountType::Percentage, 1_500, Some(2_000), 3_000, 200),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_db=info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./courier_dev.db");
    let mut demo = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--no-demo" => demo = false,
            "--help" | "-h" => {
                println!("Courier Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./courier_dev.db)");
                println!("      --no-demo      Skip the demo customer and driver");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Courier Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Vehicles
    for (code, name, capacity_kg, base, per_km) in VEHICLES {
        db.vehicles()
            .upsert(&VehicleType {
                code: code.to_string(),
                name: name.to_string(),
                capacity_kg: *capacity_kg,
                base_fare_cents: *base,
                per_km_cents: *per_km,
            })
            .await?;
    }
    println!("✓ {} vehicle classes", VEHICLES.len());

    // Promo codes
    let mut created = 0;
    for (code, description, discount_type, value, cap, min_order, limit) in PROMOS {
        if db.promos().get_by_code(code).await?.is_some() {
            continue;
        }
        db.promos()
            .create(&NewCoupon {
                code: code.to_string(),
                description: Some(description.to_string()),
                discount_type: *discount_type,
                discount_value: *value,
                max_discount_cents: *cap,
                min_order_cents: *min_order,
                usage_limit: *limit,
                expires_at: None,
            })
            .await?;
        created += 1;
    }
    println!("✓ {} promo codes ({} new)", PROMOS.len(), created);

    if demo {
        let customer = db.users().create("Demo Customer", Some("+60120000001")).await?;
        let rider = db.users().create("Demo Rider", Some("+60120000002")).await?;
        let driver = db
            .drivers()
            .create(&NewDriver {
                user_id: Some(rider.id.clone()),
                name: rider.name.clone(),
                phone: "+60120000002".to_string(),
                vehicle_type: "bike".to_string(),
                vehicle_number: "WXY 1234".to_string(),
            })
            .await?;

        println!();
        println!("Demo accounts:");
        println!("  customer  id={}  referral={}", customer.id, customer.referral_code);
        println!("  rider     id={}  driver={}", rider.id, driver.id);
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
