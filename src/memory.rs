use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::models::{Order, Post, PostId, User, UserId};
use crate::{FeedError, PostSource};

#[derive(Debug, Clone)]
struct StoredPost {
    id: PostId,
    owner: UserId,
    description: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Store {
    users: Vec<User>,
    posts: Vec<StoredPost>,
    likes: Vec<(UserId, PostId)>,
}

impl Store {
    fn hydrate(&self, post: &StoredPost) -> Result<Post, FeedError> {
        let owner = self
            .users
            .iter()
            .find(|user| user.id == post.owner)
            .cloned()
            .ok_or_else(|| FeedError::NotFound(format!("user {}", post.owner)))?;
        Ok(Post {
            id: post.id,
            owner,
            description: post.description.clone(),
            image: post.image.clone(),
            created_at: post.created_at,
        })
    }

    fn page(
        &self,
        mut posts: Vec<&StoredPost>,
        offset: u64,
        count: usize,
        order: Order,
    ) -> Result<Vec<Post>, FeedError> {
        posts.sort_by_key(|post| post.id);
        if order == Order::Desc {
            posts.reverse();
        }
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        posts
            .into_iter()
            .skip(skip)
            .take(count)
            .map(|post| self.hydrate(post))
            .collect()
    }

    fn own(&self, user_id: UserId) -> Vec<&StoredPost> {
        self.posts
            .iter()
            .filter(|post| post.owner == user_id)
            .collect()
    }

    fn liked(&self, user_id: UserId) -> Vec<&StoredPost> {
        self.posts
            .iter()
            .filter(|post| self.likes.contains(&(user_id, post.id)))
            .collect()
    }
}

/// A `PostSource` that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPostSource {
    store: Arc<Mutex<Store>>,
}

impl MemoryPostSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        let mut store = self.store.lock().await;
        store.users.retain(|existing| existing.id != user.id);
        store.users.push(user);
    }

    /// Stores a post owned by `owner`. The owner is resolved when the post is read.
    pub async fn insert_post(
        &self,
        id: PostId,
        owner: UserId,
        description: impl Into<String>,
        image: Option<String>,
        created_at: DateTime<Utc>,
    ) {
        let mut store = self.store.lock().await;
        store.posts.retain(|existing| existing.id != id);
        store.posts.push(StoredPost {
            id,
            owner,
            description: description.into(),
            image,
            created_at,
        });
    }

    pub async fn like_post(&self, user_id: UserId, post_id: PostId) {
        let mut store = self.store.lock().await;
        if !store.likes.contains(&(user_id, post_id)) {
            store.likes.push((user_id, post_id));
        }
    }
}

impl PostSource for MemoryPostSource {
    async fn own_posts(
        &self,
        user_id: UserId,
        offset: u64,
        count: usize,
        order: Order,
    ) -> Result<Vec<Post>, FeedError> {
        let store = self.store.lock().await;
        store.page(store.own(user_id), offset, count, order)
    }

    async fn liked_posts(
        &self,
        user_id: UserId,
        offset: u64,
        count: usize,
        order: Order,
    ) -> Result<Vec<Post>, FeedError> {
        let store = self.store.lock().await;
        store.page(store.liked(user_id), offset, count, order)
    }

    async fn own_post_count(&self, user_id: UserId) -> Result<u64, FeedError> {
        Ok(self.store.lock().await.own(user_id).len() as u64)
    }

    async fn liked_post_count(&self, user_id: UserId) -> Result<u64, FeedError> {
        Ok(self.store.lock().await.liked(user_id).len() as u64)
    }
}
