//! Wallet balance, top-ups and booking payment.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use courier_core::Money;
use courier_db::{Reconciliation, WalletPayment, WalletView};

use crate::auth::AuthUser;
use crate::error::{ApiResult, Envelope};
use crate::extract::ApiJson;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wallet", get(get_wallet))
        .route("/wallet/topup", post(top_up))
        .route("/wallet/pay", post(pay_booking))
        .route("/wallet/reconcile", get(reconcile))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUpRequest {
    pub amount_cents: i64,
}

impl TopUpRequest {
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub booking_id: String,
}

async fn get_wallet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Envelope<WalletView>>> {
    let view = state.db.wallets().view(&user_id).await?;
    Ok(Json(Envelope::ok(view)))
}

async fn top_up(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<TopUpRequest>,
) -> ApiResult<Json<Envelope<WalletView>>> {
    let view = state.db.wallets().top_up(&user_id, req.amount()).await?;
    let message = format!(
        "Wallet topped up. New balance {} {}",
        state.db.policy().currency,
        view.wallet.balance()
    );
    Ok(Json(Envelope::with_message(view, message)))
}

async fn pay_booking(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<PayRequest>,
) -> ApiResult<Json<Envelope<WalletPayment>>> {
    let payment = state
        .db
        .wallets()
        .pay_booking(&req.booking_id, &user_id)
        .await?;
    Ok(Json(Envelope::with_message(payment, "Payment successful")))
}

async fn reconcile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Envelope<Reconciliation>>> {
    let reconciliation = state.db.wallets().reconcile(&user_id).await?;
    Ok(Json(Envelope::ok(reconciliation)))
}
