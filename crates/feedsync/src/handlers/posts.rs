//! Post handlers.
//!
//! Creating a post persists it and then hands it to the distributor in a
//! background task; distribution never affects the response.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use feedsync_core::feed::{validate_post_text, Post, PostView};
use feedsync_core::storage::RepositoryError;

use crate::{
    context::{CurrentUser, RequestContext},
    handlers::AppError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreatePost {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedPost {
    pub post_id: Uuid,
}

/// Create a post (POST /api/posts).
#[axum::debug_handler]
pub async fn create_post(
    CurrentUser(author_id): CurrentUser,
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CreatePost>,
) -> Result<(StatusCode, Json<CreatedPost>), AppError> {
    validate_post_text(&payload.text)?;

    let post = Post::new(author_id.clone(), payload.text);
    state.posts.create_post(&post).await?;

    tracing::info!(
        request_id = %ctx.request_id,
        author_id = %author_id,
        post_id = %post.id,
        "Post created"
    );

    let post_id = post.id;
    let distributor = state.distributor.clone();
    tokio::spawn(async move {
        if let Err(err) = distributor.on_post_created(&author_id, &post).await {
            tracing::warn!(
                author_id = %author_id,
                post_id = %post.id,
                error = %err,
                "Post distribution failed"
            );
        }
    });

    Ok((StatusCode::CREATED, Json(CreatedPost { post_id })))
}

/// Get a post by id (GET /api/posts/{id}).
#[axum::debug_handler]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostView>, AppError> {
    let post = state
        .posts
        .get_post(id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            entity_type: "Post",
            id: id.to_string(),
        })?;

    Ok(Json(post.to_view()))
}
