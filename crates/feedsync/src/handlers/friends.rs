//! Friend link handlers.
//!
//! A link change alters both users' feeds, so both cached pages are
//! invalidated.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use feedsync_core::storage::RepositoryError;

use crate::{context::CurrentUser, handlers::AppError, state::AppState};

/// Link the caller with another user (PUT /api/friends/{id}).
///
/// Linking an existing friend succeeds without changes.
#[axum::debug_handler]
pub async fn add_friend(
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
    Path(friend_id): Path<String>,
) -> Result<StatusCode, AppError> {
    match state.graph.add_friend_link(&user_id, &friend_id).await {
        Ok(()) => {}
        Err(RepositoryError::AlreadyExists { .. }) => return Ok(StatusCode::NO_CONTENT),
        Err(err) => return Err(err.into()),
    }

    tracing::info!(user_id = %user_id, friend_id = %friend_id, "Friend link added");
    invalidate_pair(&state, &user_id, &friend_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove the link between the caller and another user (DELETE /api/friends/{id}).
#[axum::debug_handler]
pub async fn remove_friend(
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
    Path(friend_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.graph.remove_friend_link(&user_id, &friend_id).await?;

    tracing::info!(user_id = %user_id, friend_id = %friend_id, "Friend link removed");
    invalidate_pair(&state, &user_id, &friend_id).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn invalidate_pair(state: &AppState, user_id: &str, friend_id: &str) {
    state.distributor.invalidate_for_user(user_id).await;
    state.distributor.invalidate_for_user(friend_id).await;
}
