//! Ratings, reviews and tips.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use courier_db::{DriverRatings, RatingOutcome, RatingSubmission};

use crate::auth::AuthUser;
use crate::error::{ApiResult, Envelope};
use crate::extract::ApiJson;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ratings/{booking_id}", post(submit_rating))
        .route("/ratings/driver/{driver_id}", get(driver_ratings))
}

async fn submit_rating(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(booking_id): Path<String>,
    ApiJson(submission): ApiJson<RatingSubmission>,
) -> ApiResult<Json<Envelope<RatingOutcome>>> {
    let tip_requested = submission.tip_amount_cents.is_some_and(|tip| tip > 0);
    let outcome = state
        .db
        .ratings()
        .submit(&booking_id, &user_id, submission)
        .await?;

    let message = if tip_requested && !outcome.tip_transferred {
        "Rating submitted. Tip was not transferred"
    } else {
        "Rating submitted"
    };
    Ok(Json(Envelope::with_message(outcome, message)))
}

async fn driver_ratings(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(driver_id): Path<String>,
) -> ApiResult<Json<Envelope<DriverRatings>>> {
    let summary = state.db.ratings().driver_summary(&driver_id).await?;
    Ok(Json(Envelope::ok(summary)))
}
