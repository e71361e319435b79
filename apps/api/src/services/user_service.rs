//! The caller's profile and saved addresses.
//!
//! ```text
//! GET  /me                  profile, including the referral code to share
//! POST /addresses           save an address
//! GET  /addresses           saved addresses, newest first
//! GET  /addresses/{id}      one saved address (owner only)
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use courier_core::{Address, CoreError, User};
use courier_db::NewAddress;

use crate::auth::AuthUser;
use crate::error::{ApiResult, Envelope};
use crate::extract::ApiJson;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/addresses", post(create_address).get(list_addresses))
        .route("/addresses/{id}", get(get_address))
}

async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Envelope<User>>> {
    let user = state
        .db
        .users()
        .get_by_id(&user_id)
        .await?
        .ok_or_else(|| CoreError::not_found("User", &user_id))?;
    Ok(Json(Envelope::ok(user)))
}

async fn create_address(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(address): ApiJson<NewAddress>,
) -> ApiResult<(StatusCode, Json<Envelope<Address>>)> {
    let address = state.db.addresses().create(&user_id, &address).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(address))))
}

async fn list_addresses(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Envelope<Vec<Address>>>> {
    let addresses = state.db.addresses().list_for_user(&user_id).await?;
    Ok(Json(Envelope::ok(addresses)))
}

async fn get_address(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<Address>>> {
    let address = state
        .db
        .addresses()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::not_found("Address", &id))?;
    if address.user_id != user_id {
        return Err(CoreError::forbidden("Address", id).into());
    }
    Ok(Json(Envelope::ok(address)))
}
