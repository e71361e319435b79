//! Booking lifecycle routes.
//!
//! ```text
//! POST /bookings                         create
//! GET  /bookings?status=IN_TRANSIT       list (requester)
//! GET  /bookings/{id}                    details + order + invoice (requester)
//! POST /bookings/{id}/verify-delivery    OTP check (requester or driver)
//! PUT  /bookings/{id}/status             lifecycle move (requester or driver)
//! GET  /bookings/{id}/eta                phase message (requester or driver)
//! POST /bookings/{id}/cancel             cancel + refund (requester)
//! ```
//!
//! The delivery OTP is only shown to the requester; a driver sees an empty
//! string.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;

use courier_core::{Booking, BookingStatus};
use courier_db::{BookingDetails, EtaView, NewBooking, StatusUpdate};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult, Envelope};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/verify-delivery", post(verify_delivery))
        .route("/bookings/{id}/status", put(update_status))
        .route("/bookings/{id}/eta", get(get_eta))
        .route("/bookings/{id}/cancel", post(cancel_booking))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDeliveryRequest {
    #[serde(default)]
    pub otp: String,
    #[serde(default)]
    pub delivery_proof_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

async fn create_booking(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(input): ApiJson<NewBooking>,
) -> ApiResult<(StatusCode, Json<Envelope<BookingDetails>>)> {
    let details = state.db.bookings().create(&user_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(details, "Booking created")),
    ))
}

async fn list_bookings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Envelope<Vec<BookingDetails>>>> {
    let bookings = state.db.bookings().list(&user_id, query.status).await?;
    debug!(user_id = %user_id, count = bookings.len(), "Listed bookings");
    Ok(Json(Envelope::ok(bookings)))
}

async fn get_booking(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<BookingDetails>>> {
    let details = state.db.bookings().get(&id, &user_id).await?;
    Ok(Json(Envelope::ok(details)))
}

async fn verify_delivery(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<VerifyDeliveryRequest>,
) -> ApiResult<Json<Envelope<Booking>>> {
    let booking = state
        .db
        .bookings()
        .verify_delivery(&id, &user_id, &req.otp, req.delivery_proof_url.as_deref())
        .await?;
    Ok(Json(Envelope::with_message(
        for_caller(booking, &user_id),
        "Delivery verified",
    )))
}

async fn update_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> ApiResult<Json<Envelope<Booking>>> {
    let booking = state.db.bookings().update_status(&id, &user_id, update).await?;
    Ok(Json(Envelope::ok(for_caller(booking, &user_id))))
}

async fn get_eta(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<EtaView>>> {
    let eta = state.db.bookings().eta(&id, &user_id).await?;
    Ok(Json(Envelope::ok(eta)))
}

/// The body is optional here; an empty request cancels without a reason.
async fn cancel_booking(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Envelope<Booking>>> {
    let req: CancelRequest = if body.is_empty() {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let booking = state
        .db
        .bookings()
        .cancel(&id, &user_id, req.reason.as_deref())
        .await?;
    Ok(Json(Envelope::with_message(booking, "Booking cancelled")))
}

fn for_caller(mut booking: Booking, user_id: &str) -> Booking {
    if booking.user_id != user_id {
        booking.delivery_otp.clear();
    }
    booking
}
