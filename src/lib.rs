mod config;
mod error;
mod feed;
mod interleave;
mod memory;
mod mixed_posts;
mod models;
mod post_source;
mod sqlite;

pub use config::Config;
pub use error::FeedError;
pub use feed::{routes, serve};
pub use interleave::{interleave_runs, interleave_runs_by, interleave_runs_checked};
pub use memory::MemoryPostSource;
pub use mixed_posts::{mix_by_owners, MixedPosts};
pub use models::{FeedPage, FeedQuery, Order, Post, PostId, User, UserId};
pub use post_source::PostSource;
pub use sqlite::SqlitePostSource;
