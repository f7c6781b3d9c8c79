use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::models::{Order, Post, PostId, User, UserId};
use crate::{FeedError, PostSource};

/// A `PostSource` backed by a SQLite database.
#[derive(Debug, Clone)]
pub struct SqlitePostSource {
    db: Arc<Mutex<Connection>>,
}

struct PostRow {
    id: PostId,
    owner: UserId,
    description: String,
    image: Option<String>,
    created_at: i64,
}

impl SqlitePostSource {
    pub fn new(db: Connection) -> Self {
        SqlitePostSource {
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        Ok(Self::new(Connection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, FeedError> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    pub async fn initialize_db(&self) -> Result<(), FeedError> {
        let db = self.db.lock().await;
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL,
                full_name TEXT NOT NULL,
                profile_picture TEXT
            );
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                description TEXT NOT NULL,
                image TEXT,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS posts_user_id ON posts (user_id, id);
            CREATE TABLE IF NOT EXISTS likes (
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, post_id)
            );",
        )?;
        Ok(())
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), FeedError> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT OR REPLACE INTO users (id, username, full_name, profile_picture)
             VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.username, user.full_name, user.profile_picture],
        )?;
        Ok(())
    }

    pub async fn insert_post(
        &self,
        id: PostId,
        owner: UserId,
        description: &str,
        image: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<(), FeedError> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT OR REPLACE INTO posts (id, user_id, description, image, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, owner, description, image, created_at.timestamp_millis()],
        )?;
        Ok(())
    }

    pub async fn like_post(&self, user_id: UserId, post_id: PostId) -> Result<(), FeedError> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT OR IGNORE INTO likes (post_id, user_id, created_at)
             SELECT ?1, ?2, ?3
             WHERE EXISTS (SELECT 1 FROM posts WHERE id = ?1)",
            params![post_id, user_id, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    pub async fn find_user(&self, id: UserId) -> Result<User, FeedError> {
        let db = self.db.lock().await;
        find_user(&db, id)
    }
}

fn find_user(db: &Connection, id: UserId) -> Result<User, FeedError> {
    db.query_row(
        "SELECT id, username, full_name, profile_picture FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                full_name: row.get(2)?,
                profile_picture: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| FeedError::NotFound(format!("user {id}")))
}

fn query_posts(
    db: &Connection,
    sql: &str,
    user_id: UserId,
    offset: u64,
    count: usize,
) -> Result<Vec<Post>, FeedError> {
    let limit = i64::try_from(count).unwrap_or(i64::MAX);
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);

    let mut stmt = db.prepare(sql)?;
    let rows = stmt
        .query_map(params![user_id, limit, offset], |row| {
            Ok(PostRow {
                id: row.get(0)?,
                owner: row.get(1)?,
                description: row.get(2)?,
                image: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut owners: HashMap<UserId, User> = HashMap::new();
    let mut posts = Vec::with_capacity(rows.len());
    for row in rows {
        let owner = match owners.get(&row.owner) {
            Some(owner) => owner.clone(),
            None => {
                let owner = find_user(db, row.owner)?;
                owners.insert(row.owner, owner.clone());
                owner
            }
        };
        let created_at = DateTime::from_timestamp_millis(row.created_at).ok_or_else(|| {
            FeedError::unavailable(format!("post {} has an invalid timestamp", row.id))
        })?;
        posts.push(Post {
            id: row.id,
            owner,
            description: row.description,
            image: row.image,
            created_at,
        });
    }
    Ok(posts)
}

impl PostSource for SqlitePostSource {
    async fn own_posts(
        &self,
        user_id: UserId,
        offset: u64,
        count: usize,
        order: Order,
    ) -> Result<Vec<Post>, FeedError> {
        debug!("Own posts of {user_id}: offset {offset}, count {count}, {order}");
        let sql = format!(
            "SELECT id, user_id, description, image, created_at FROM posts
             WHERE user_id = ?1
             ORDER BY id {}
             LIMIT ?2 OFFSET ?3",
            order.as_sql()
        );
        let db = self.db.lock().await;
        query_posts(&db, &sql, user_id, offset, count)
    }

    async fn liked_posts(
        &self,
        user_id: UserId,
        offset: u64,
        count: usize,
        order: Order,
    ) -> Result<Vec<Post>, FeedError> {
        debug!("Liked posts of {user_id}: offset {offset}, count {count}, {order}");
        let sql = format!(
            "SELECT posts.id, posts.user_id, posts.description, posts.image, posts.created_at
             FROM likes
             JOIN posts ON posts.id = likes.post_id
             WHERE likes.user_id = ?1
             ORDER BY likes.post_id {}
             LIMIT ?2 OFFSET ?3",
            order.as_sql()
        );
        let db = self.db.lock().await;
        query_posts(&db, &sql, user_id, offset, count)
    }

    async fn own_post_count(&self, user_id: UserId) -> Result<u64, FeedError> {
        let db = self.db.lock().await;
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM posts WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    async fn liked_post_count(&self, user_id: UserId) -> Result<u64, FeedError> {
        let db = self.db.lock().await;
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM likes JOIN posts ON posts.id = likes.post_id
             WHERE likes.user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn source() -> SqlitePostSource {
        let source = SqlitePostSource::open_in_memory().unwrap();
        source.initialize_db().await.unwrap();
        for id in [1, 2] {
            source
                .insert_user(&User {
                    id,
                    username: format!("user{id}"),
                    full_name: format!("User {id}"),
                    profile_picture: None,
                })
                .await
                .unwrap();
        }
        let now = Utc::now();
        for (id, owner) in [(1, 1), (2, 1), (3, 2), (4, 2)] {
            source
                .insert_post(id, owner, "something", None, now)
                .await
                .unwrap();
        }
        source.like_post(1, 3).await.unwrap();
        source.like_post(1, 4).await.unwrap();
        source
    }

    #[tokio::test]
    async fn own_posts_are_paged_by_id() {
        let source = source().await;
        let posts = source.own_posts(1, 0, 10, Order::Desc).await.unwrap();
        assert_eq!(posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(posts[0].owner.username, "user1");

        let posts = source.own_posts(1, 1, 10, Order::Asc).await.unwrap();
        assert_eq!(posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn liked_posts_skip_likes_of_missing_posts() {
        let source = source().await;
        source.like_post(1, 99).await.unwrap();
        let posts = source.liked_posts(1, 0, 10, Order::Desc).await.unwrap();
        assert_eq!(posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![4, 3]);
        assert_eq!(source.liked_post_count(1).await.unwrap(), 2);
        assert_eq!(source.own_post_count(2).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn missing_owner_is_not_found() {
        let source = source().await;
        source
            .insert_post(5, 7, "orphan", None, Utc::now())
            .await
            .unwrap();
        let err = source.own_posts(7, 0, 1, Order::Desc).await.unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
        assert!(matches!(
            source.find_user(7).await,
            Err(FeedError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn feed_of_post_with_missing_owner_is_not_found() {
        let source = source().await;
        source
            .insert_post(6, 9, "orphan", None, Utc::now())
            .await
            .unwrap();
        source.like_post(1, 6).await.unwrap();

        let feed = crate::MixedPosts::new(source);
        let err = feed.get_mixed_feed_posts(1, None, 4).await.unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }

    #[tokio::test]
    async fn broken_schema_is_source_unavailable() {
        let source = SqlitePostSource::open_in_memory().unwrap();
        let err = source.own_posts(1, 0, 1, Order::Desc).await.unwrap_err();
        assert!(matches!(err, FeedError::SourceUnavailable(_)));
    }
}
