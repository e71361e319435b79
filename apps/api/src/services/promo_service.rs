//! Promo codes and referrals.
//!
//! ```text
//! POST /promo/validate          quote only, nothing recorded
//! POST /promo/apply             attach a code to a booking (one per booking)
//! GET  /promo/coupons           codes the caller can still use
//! GET  /promo/referral          caller's referral code and earnings
//! POST /promo/referral/apply    redeem someone else's referral code
//! ```

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use courier_core::promo::DiscountQuote;
use courier_core::{Coupon, Money, Referral};
use courier_db::{AppliedPromo, ReferralInfo};

use crate::auth::AuthUser;
use crate::error::{ApiResult, Envelope};
use crate::extract::ApiJson;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/promo/validate", post(validate_promo))
        .route("/promo/apply", post(apply_promo))
        .route("/promo/coupons", get(list_coupons))
        .route("/promo/referral", get(referral_info))
        .route("/promo/referral/apply", post(apply_referral))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoRequest {
    pub code: String,
    pub order_amount_cents: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyPromoRequest {
    pub code: String,
    pub booking_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReferralRequest {
    pub referral_code: String,
}

async fn validate_promo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<ValidatePromoRequest>,
) -> ApiResult<Json<Envelope<DiscountQuote>>> {
    let quote = state
        .db
        .promos()
        .validate(&req.code, &user_id, Money::from_cents(req.order_amount_cents))
        .await?;
    Ok(Json(Envelope::ok(quote)))
}

async fn apply_promo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<ApplyPromoRequest>,
) -> ApiResult<Json<Envelope<AppliedPromo>>> {
    let applied = state
        .db
        .promos()
        .apply(&req.code, &req.booking_id, &user_id)
        .await?;
    Ok(Json(Envelope::with_message(applied, "Promo code applied")))
}

async fn list_coupons(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Envelope<Vec<Coupon>>>> {
    let coupons = state.db.promos().list_available(&user_id).await?;
    Ok(Json(Envelope::ok(coupons)))
}

async fn referral_info(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Envelope<ReferralInfo>>> {
    let info = state.db.referrals().info(&user_id).await?;
    Ok(Json(Envelope::ok(info)))
}

async fn apply_referral(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<ApplyReferralRequest>,
) -> ApiResult<Json<Envelope<Referral>>> {
    let referral = state
        .db
        .referrals()
        .apply(&req.referral_code, &user_id)
        .await?;
    let reward = Money::from_cents(referral.reward_cents);
    let message = format!(
        "Referral code applied. You and your friend each received {} {}",
        state.db.policy().currency,
        reward
    );
    Ok(Json(Envelope::with_message(referral, message)))
}
