use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a user, as issued by the authentication layer.
pub type UserId = String;

/// Format used for `create_time` in the read API and the real-time push.
pub const CREATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A persisted post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    pub author_id: UserId,
    pub create_time: DateTime<Utc>,
}

impl Post {
    /// Creates a new post authored now.
    pub fn new(author_id: impl Into<UserId>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            author_id: author_id.into(),
            create_time: Utc::now(),
        }
    }

    /// Sets a specific creation time (useful for testing feed ordering).
    pub fn with_create_time(mut self, create_time: DateTime<Utc>) -> Self {
        self.create_time = create_time;
        self
    }

    /// Returns the wire representation of this post.
    pub fn to_view(&self) -> PostView {
        PostView::from(self)
    }
}

/// Wire representation of a post.
///
/// This is the JSON shape returned by the read API and pushed verbatim over
/// real-time connections, one message per post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub text: String,
    #[serde(alias = "author_user_id")]
    pub author_id: UserId,
    pub create_time: String,
}

impl From<&Post> for PostView {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.to_string(),
            text: post.text.clone(),
            author_id: post.author_id.clone(),
            create_time: post.create_time.format(CREATE_TIME_FORMAT).to_string(),
        }
    }
}
