//! Feed read handler.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use feedsync_core::feed::{FeedWindow, PostView};

use crate::{context::CurrentUser, handlers::AppError, state::AppState};

/// Query parameters for reading a feed page. Missing values fall back to
/// the cached top window.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl FeedQuery {
    fn window(&self, top: FeedWindow) -> FeedWindow {
        FeedWindow::new(
            self.offset.unwrap_or(top.offset),
            self.limit.unwrap_or(top.limit),
        )
    }
}

/// Read the caller's feed (GET /api/feed).
#[axum::debug_handler]
pub async fn get_feed(
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let window = query.window(state.feed.top_window());
    let posts = state.feed.get_feed(&user_id, window).await?;
    Ok(Json(posts.iter().map(PostView::from).collect()))
}
