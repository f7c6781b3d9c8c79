use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type PostId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub profile_picture: Option<String>,
}

/// A hydrated post. The feed only looks at `id` and `owner`, everything else is carried through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub owner: User,
    pub description: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Id order requested from a `PostSource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl Order {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Asc => write!(f, "asc"),
            Order::Desc => write!(f, "desc"),
        }
    }
}

/// One page of a mixed feed.
///
/// `next_cursor` is `None` exactly when the page could not be filled, which is the only
/// end-of-feed signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub next_cursor: Option<u64>,
}

impl FeedPage {
    pub fn ids(&self) -> Vec<PostId> {
        self.posts.iter().map(|post| post.id).collect()
    }
}

/// Query string of `GET /users/{id}/feed`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    pub cursor: Option<u64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}
