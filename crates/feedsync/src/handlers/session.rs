//! Session handler.
//!
//! Credentials are checked by the fronting gateway; this endpoint is called
//! once a login succeeded so the user's cached first page is rebuilt before
//! they read it.

use axum::{extract::State, http::StatusCode};

use crate::{context::CurrentUser, state::AppState};

/// Record a successful login (POST /api/session).
#[axum::debug_handler]
pub async fn login(CurrentUser(user_id): CurrentUser, State(state): State<AppState>) -> StatusCode {
    tracing::info!(user_id = %user_id, "User logged in");
    state.distributor.invalidate_for_user(&user_id).await;
    StatusCode::NO_CONTENT
}
