//! In-memory repository implementation.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use feedsync_core::feed::{FeedWindow, Post, UserId};
use feedsync_core::storage::{PostRepository, RepositoryError, Result, SocialGraph};

/// In-memory storage backend.
///
/// Friend links are stored in both directions so lookups never need a union.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    posts: Arc<RwLock<HashMap<Uuid, Post>>>,
    friends: Arc<RwLock<HashMap<UserId, BTreeSet<UserId>>>>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

fn link_id(user_id: &str, friend_id: &str) -> String {
    format!("{user_id}:{friend_id}")
}

#[async_trait]
impl PostRepository for InMemoryRepository {
    async fn create_post(&self, post: &Post) -> Result<()> {
        let mut posts = self.posts.write().await;
        if posts.contains_key(&post.id) {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Post",
                id: post.id.to_string(),
            });
        }
        posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn feed_page(&self, user_id: &str, window: FeedWindow) -> Result<Vec<Post>> {
        let friends = self
            .friends
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        if friends.is_empty() {
            return Ok(Vec::new());
        }

        let posts = self.posts.read().await;
        let mut page: Vec<Post> = posts
            .values()
            .filter(|p| p.author_id != user_id && friends.contains(&p.author_id))
            .cloned()
            .collect();
        page.sort_by_key(|p| Reverse((p.create_time, p.id)));

        Ok(page
            .into_iter()
            .skip(window.offset)
            .take(window.limit)
            .collect())
    }
}

#[async_trait]
impl SocialGraph for InMemoryRepository {
    async fn friends_of(&self, user_id: &str) -> Result<Vec<UserId>> {
        let friends = self.friends.read().await;
        Ok(friends
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_friend_link(&self, user_id: &str, friend_id: &str) -> Result<()> {
        if user_id == friend_id {
            return Err(RepositoryError::InvalidData(format!(
                "User {user_id} cannot befriend themselves"
            )));
        }

        let mut friends = self.friends.write().await;
        let inserted = friends
            .entry(user_id.to_string())
            .or_default()
            .insert(friend_id.to_string());
        if !inserted {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "FriendLink",
                id: link_id(user_id, friend_id),
            });
        }
        friends
            .entry(friend_id.to_string())
            .or_default()
            .insert(user_id.to_string());
        Ok(())
    }

    async fn remove_friend_link(&self, user_id: &str, friend_id: &str) -> Result<()> {
        let mut friends = self.friends.write().await;
        for (from, to) in [(user_id, friend_id), (friend_id, user_id)] {
            if let Some(set) = friends.get_mut(from) {
                set.remove(to);
                if set.is_empty() {
                    friends.remove(from);
                }
            }
        }
        Ok(())
    }
}
