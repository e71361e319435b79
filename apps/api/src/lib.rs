//! # Courier API
//!
//! HTTP server for bookings, wallets, promotions, ratings and invoices.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           API Services                                  │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │ booking_service│  │ promo_service  │  │ wallet_service             ││
//! │  │                │  │                │  │                            ││
//! │  │ • create/list  │  │ • validate     │  │ • balance                  ││
//! │  │ • get / eta    │  │ • apply        │  │ • topup                    ││
//! │  │ • verify/status│  │ • coupons      │  │ • pay                      ││
//! │  │ • cancel       │  │ • referral     │  │ • reconcile                ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐  ┌───────┐ │
//! │  │ rating_service │  │invoice_service │  │ health_service │  │ user_ │ │
//! │  │                │  │                │  │                │  │service│ │
//! │  │ • submit       │  │ • get/generate │  │ • health       │  │ • me  │ │
//! │  │ • driver view  │  │                │  │ • vehicles     │  │ • addr│ │
//! │  └────────────────┘  └────────────────┘  └────────────────┘  └───────┘ │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────────────────┐  ┌──────────────────────────────┐  │  │
//! │  │  │  courier-db Database     │  │    JWT Auth                  │  │  │
//! │  │  │  SQLite pool + policy    │  │    bearer token → user id    │  │  │
//! │  │  └──────────────────────────┘  └──────────────────────────────┘  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - listen port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./courier.db)
//! - `DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `JWT_SECRET` - Secret for JWT verification
//! - `JWT_ACCESS_LIFETIME_SECS` - Access token lifetime (default: 3600)
//! - `TAX_RATE_BPS` - invoice tax rate (default: 600)
//! - `CURRENCY` - invoice currency (default: MYR)
//! - `REFERRAL_REWARD_CENTS` - referral reward per side (default: 500)
//! - `MAX_TOP_UP_CENTS` - top-up ceiling (default: 100000)

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod services;

// Re-exports
pub use auth::{AuthUser, JwtManager};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, Envelope};

use courier_db::Database;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager) -> Self {
        AppState {
            db,
            jwt: Arc::new(jwt),
        }
    }
}

/// Builds the full router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(services::health_service::routes())
        .merge(services::booking_service::routes())
        .merge(services::user_service::routes())
        .merge(services::promo_service::routes())
        .merge(services::rating_service::routes())
        .merge(services::wallet_service::routes())
        .merge(services::invoice_service::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
