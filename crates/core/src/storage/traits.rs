use async_trait::async_trait;
use uuid::Uuid;

use crate::feed::{FeedWindow, Post, UserId};

use super::Result;

/// Durable post storage and the paginated feed built from it.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Persists a new post.
    async fn create_post(&self, post: &Post) -> Result<()>;

    /// Gets a post by its ID.
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>>;

    /// Returns one page of a user's feed: posts authored by their friends,
    /// newest first, never including the user's own posts.
    async fn feed_page(&self, user_id: &str, window: FeedWindow) -> Result<Vec<Post>>;
}

/// Undirected friend links between users.
#[async_trait]
pub trait SocialGraph: Send + Sync {
    /// Returns the distinct friend ids of a user.
    async fn friends_of(&self, user_id: &str) -> Result<Vec<UserId>>;

    /// Links two users. Linking a user to themselves is invalid.
    async fn add_friend_link(&self, user_id: &str, friend_id: &str) -> Result<()>;

    /// Removes the link between two users, in either direction.
    async fn remove_friend_link(&self, user_id: &str, friend_id: &str) -> Result<()>;
}
