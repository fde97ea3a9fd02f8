//! Test doubles for the external seams.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use feedsync_core::bus::{
    self, BusError, Consumer, ConsumerTag, MessageBus, QueueHandle,
};
use feedsync_core::cache::{self, Cache, CacheError};
use feedsync_core::feed::{FeedWindow, Post, UserId};
use feedsync_core::storage::{self, PostRepository, RepositoryError, SocialGraph};

use crate::cache::MemoryBus;
use crate::storage::InMemoryRepository;

/// A publish observed by [`RecordingBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub exchange: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
}

/// Message bus that routes like [`MemoryBus`] and records every call.
#[derive(Clone, Default)]
pub struct RecordingBus {
    inner: MemoryBus,
    published: Arc<Mutex<Vec<Published>>>,
    failing_keys: Arc<Mutex<HashSet<String>>>,
    consumes: Arc<AtomicUsize>,
    cancels: Arc<AtomicUsize>,
    fail_queue_declare: Arc<AtomicBool>,
    fail_consume: Arc<AtomicBool>,
    consumer_tags: Arc<Mutex<Vec<ConsumerTag>>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes publishes to `routing_key` fail.
    pub fn fail_publish_to(&self, routing_key: &str) {
        self.failing_keys
            .lock()
            .unwrap()
            .insert(routing_key.to_string());
    }

    pub fn fail_queue_declare(&self, fail: bool) {
        self.fail_queue_declare.store(fail, Ordering::SeqCst);
    }

    pub fn fail_consume(&self, fail: bool) {
        self.fail_consume.store(fail, Ordering::SeqCst);
    }

    /// Ends a consumer's delivery stream from the broker side, as a dropped
    /// broker connection would. Not counted as a cancel.
    pub async fn end_stream(&self, consumer: &ConsumerTag) {
        self.inner.cancel(consumer).await.unwrap();
    }

    /// Tags handed out by `consume`, oldest first.
    pub fn consumer_tags(&self) -> Vec<ConsumerTag> {
        self.consumer_tags.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .published()
            .into_iter()
            .map(|p| p.routing_key)
            .collect();
        keys.sort();
        keys
    }

    pub fn consume_calls(&self) -> usize {
        self.consumes.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub async fn active_consumers(&self) -> usize {
        self.inner.consumer_count().await
    }

    pub async fn live_queues(&self) -> usize {
        self.inner.queue_count().await
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn declare_topic_exchange(&self, exchange: &str) -> bus::Result<()> {
        self.inner.declare_topic_exchange(exchange).await
    }

    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> bus::Result<()> {
        if self.failing_keys.lock().unwrap().contains(routing_key) {
            return Err(BusError::PublishFailed(format!("refused {routing_key}")));
        }
        self.published.lock().unwrap().push(Published {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            payload: payload.to_vec(),
        });
        self.inner.publish(exchange, routing_key, payload).await
    }

    async fn declare_exclusive_queue(&self) -> bus::Result<QueueHandle> {
        if self.fail_queue_declare.load(Ordering::SeqCst) {
            return Err(BusError::ConnectionFailed("broker down".to_string()));
        }
        // Widen the window between "first connection seen" and "consumer
        // active" so concurrent registrations overlap.
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.inner.declare_exclusive_queue().await
    }

    async fn bind(&self, queue: &QueueHandle, routing_key: &str, exchange: &str) -> bus::Result<()> {
        self.inner.bind(queue, routing_key, exchange).await
    }

    async fn consume(&self, queue: &QueueHandle) -> bus::Result<Consumer> {
        self.consumes.fetch_add(1, Ordering::SeqCst);
        if self.fail_consume.load(Ordering::SeqCst) {
            return Err(BusError::ConnectionFailed("broker down".to_string()));
        }
        let consumer = self.inner.consume(queue).await?;
        self.consumer_tags.lock().unwrap().push(consumer.tag.clone());
        Ok(consumer)
    }

    async fn cancel(&self, consumer: &ConsumerTag) -> bus::Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.inner.cancel(consumer).await
    }

    async fn delete_queue(&self, queue: &QueueHandle) -> bus::Result<()> {
        self.inner.delete_queue(queue).await
    }
}

/// Repository that counts feed reads and can be switched to fail them.
#[derive(Clone, Default)]
pub struct CountingFeedStore {
    inner: InMemoryRepository,
    feed_reads: Arc<AtomicUsize>,
    fail_feed: Arc<AtomicBool>,
}

impl CountingFeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_reads(&self) -> usize {
        self.feed_reads.load(Ordering::SeqCst)
    }

    pub fn fail_feed(&self, fail: bool) {
        self.fail_feed.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PostRepository for CountingFeedStore {
    async fn create_post(&self, post: &Post) -> storage::Result<()> {
        self.inner.create_post(post).await
    }

    async fn get_post(&self, id: Uuid) -> storage::Result<Option<Post>> {
        self.inner.get_post(id).await
    }

    async fn feed_page(&self, user_id: &str, window: FeedWindow) -> storage::Result<Vec<Post>> {
        self.feed_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_feed.load(Ordering::SeqCst) {
            return Err(RepositoryError::ConnectionFailed("feed store down".to_string()));
        }
        self.inner.feed_page(user_id, window).await
    }
}

#[async_trait]
impl SocialGraph for CountingFeedStore {
    async fn friends_of(&self, user_id: &str) -> storage::Result<Vec<UserId>> {
        self.inner.friends_of(user_id).await
    }

    async fn add_friend_link(&self, user_id: &str, friend_id: &str) -> storage::Result<()> {
        self.inner.add_friend_link(user_id, friend_id).await
    }

    async fn remove_friend_link(&self, user_id: &str, friend_id: &str) -> storage::Result<()> {
        self.inner.remove_friend_link(user_id, friend_id).await
    }
}

/// Social graph whose every call fails.
pub struct FailingGraph;

#[async_trait]
impl SocialGraph for FailingGraph {
    async fn friends_of(&self, _user_id: &str) -> storage::Result<Vec<UserId>> {
        Err(RepositoryError::ConnectionFailed("graph down".to_string()))
    }

    async fn add_friend_link(&self, _user_id: &str, _friend_id: &str) -> storage::Result<()> {
        Err(RepositoryError::ConnectionFailed("graph down".to_string()))
    }

    async fn remove_friend_link(&self, _user_id: &str, _friend_id: &str) -> storage::Result<()> {
        Err(RepositoryError::ConnectionFailed("graph down".to_string()))
    }
}

/// Cache whose every call fails.
pub struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    async fn exists(&self, _key: &str) -> cache::Result<bool> {
        Err(CacheError::ConnectionFailed("cache down".to_string()))
    }

    async fn get(&self, _key: &str) -> cache::Result<Option<Vec<u8>>> {
        Err(CacheError::ConnectionFailed("cache down".to_string()))
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> cache::Result<()> {
        Err(CacheError::ConnectionFailed("cache down".to_string()))
    }

    async fn delete(&self, _key: &str) -> cache::Result<()> {
        Err(CacheError::ConnectionFailed("cache down".to_string()))
    }
}
