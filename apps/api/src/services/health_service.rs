//! Unauthenticated routes: health check and the vehicle fare table.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use courier_core::VehicleType;

use crate::error::{ApiResult, Envelope};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/vehicles", get(list_vehicles))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub database: bool,
    pub server_time: String,
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Envelope<HealthReport>>) {
    let database = state.db.health_check().await;
    let report = HealthReport {
        database,
        server_time: Utc::now().to_rfc3339(),
    };

    if database {
        (StatusCode::OK, Json(Envelope::ok(report)))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Envelope {
                success: false,
                data: Some(report),
                message: Some("Database unhealthy".to_string()),
            }),
        )
    }
}

async fn list_vehicles(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<Vec<VehicleType>>>> {
    let vehicles = state.db.vehicles().list().await?;
    Ok(Json(Envelope::ok(vehicles)))
}
