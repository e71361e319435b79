//! Invoice generation. GET and POST behave the same: the first call for a
//! booking creates the invoice, later calls return it unchanged.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use courier_core::Invoice;

use crate::auth::AuthUser;
use crate::error::{ApiResult, Envelope};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/invoices/{booking_id}", get(invoice).post(invoice))
}

async fn invoice(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(booking_id): Path<String>,
) -> ApiResult<Json<Envelope<Invoice>>> {
    let invoice = state
        .db
        .invoices()
        .get_or_generate(&booking_id, &user_id)
        .await?;
    Ok(Json(Envelope::ok(invoice)))
}
