#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mixfeed::{
    FeedError, MemoryPostSource, MixedPosts, Order, Post, PostId, PostSource, SqlitePostSource,
    User, UserId,
};

pub fn user(id: UserId) -> User {
    User {
        id,
        username: format!("user{id}"),
        full_name: format!("User {id}"),
        profile_picture: None,
    }
}

pub fn created_at(id: PostId) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + id, 0).unwrap_or_default()
}

/// User 1 owns posts 1-6 and likes posts 7-10 (7 and 8 by user 2, 9 and 10 by user 3).
pub async fn sample_memory_source() -> MemoryPostSource {
    let source = MemoryPostSource::new();
    for id in 1..=3 {
        source.insert_user(user(id)).await;
    }
    for (id, owner) in sample_posts() {
        source
            .insert_post(id, owner, "something", None, created_at(id))
            .await;
    }
    for id in 7..=10 {
        source.like_post(1, id).await;
    }
    source
}

pub async fn sample_sqlite_source() -> SqlitePostSource {
    let source = SqlitePostSource::open_in_memory().unwrap();
    source.initialize_db().await.unwrap();
    for id in 1..=3 {
        source.insert_user(&user(id)).await.unwrap();
    }
    for (id, owner) in sample_posts() {
        source
            .insert_post(id, owner, "something", None, created_at(id))
            .await
            .unwrap();
    }
    for id in 7..=10 {
        source.like_post(1, id).await.unwrap();
    }
    source
}

fn sample_posts() -> Vec<(PostId, UserId)> {
    vec![
        (1, 1),
        (2, 1),
        (3, 1),
        (4, 1),
        (5, 1),
        (6, 1),
        (7, 2),
        (8, 2),
        (9, 3),
        (10, 3),
    ]
}

/// User 1 owns `own` posts (ids 1..) and likes `liked` posts of user 2 (ids 1001..).
pub async fn sized_source(own: i64, liked: i64) -> MemoryPostSource {
    let source = MemoryPostSource::new();
    source.insert_user(user(1)).await;
    source.insert_user(user(2)).await;
    for id in 1..=own {
        source.insert_post(id, 1, "own", None, created_at(id)).await;
    }
    for id in 1001..=1000 + liked {
        source.insert_post(id, 2, "liked", None, created_at(id)).await;
        source.like_post(1, id).await;
    }
    source
}

/// Follows `next_cursor` from the first page until the feed ends.
pub async fn walk<S: PostSource>(feed: &MixedPosts<S>, user_id: UserId, count: usize) -> Vec<PostId> {
    let mut ids = Vec::new();
    let mut cursor = None;
    for _ in 0..1000 {
        let page = feed
            .get_mixed_feed_posts(user_id, cursor, count)
            .await
            .unwrap();
        assert!(page.posts.len() <= count);
        ids.extend(page.ids());
        match page.next_cursor {
            Some(next) => {
                assert_eq!(page.posts.len(), count);
                assert_eq!(next, cursor.unwrap_or(0) + count as u64);
                cursor = Some(next);
            }
            None => return ids,
        }
    }
    panic!("feed of user {user_id} never ended");
}

/// Counts reads and can be told to fail on liked posts.
#[derive(Clone, Default)]
pub struct ProbedSource {
    pub inner: MemoryPostSource,
    pub fetches: Arc<AtomicUsize>,
    pub totals: Arc<AtomicUsize>,
    pub fail_liked: bool,
}

impl ProbedSource {
    pub fn new(inner: MemoryPostSource) -> Self {
        ProbedSource {
            inner,
            ..Default::default()
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn totals(&self) -> usize {
        self.totals.load(Ordering::SeqCst)
    }
}

impl PostSource for ProbedSource {
    async fn own_posts(
        &self,
        user_id: UserId,
        offset: u64,
        count: usize,
        order: Order,
    ) -> Result<Vec<Post>, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.own_posts(user_id, offset, count, order).await
    }

    async fn liked_posts(
        &self,
        user_id: UserId,
        offset: u64,
        count: usize,
        order: Order,
    ) -> Result<Vec<Post>, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_liked {
            return Err(FeedError::unavailable("connection reset"));
        }
        self.inner.liked_posts(user_id, offset, count, order).await
    }

    async fn own_post_count(&self, user_id: UserId) -> Result<u64, FeedError> {
        self.totals.fetch_add(1, Ordering::SeqCst);
        self.inner.own_post_count(user_id).await
    }

    async fn liked_post_count(&self, user_id: UserId) -> Result<u64, FeedError> {
        self.totals.fetch_add(1, Ordering::SeqCst);
        self.inner.liked_post_count(user_id).await
    }
}
