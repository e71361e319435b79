//! HTTP route handlers.
//!
//! Each module exposes `routes()`, merged by [`crate::router`]. Handlers stay
//! thin: extract, call one `courier-db` operation, wrap the result.

pub mod booking_service;
pub mod health_service;
pub mod invoice_service;
pub mod promo_service;
pub mod rating_service;
pub mod user_service;
pub mod wallet_service;
