use crate::models::{Order, Post, UserId};
use crate::FeedError;

/// Read access to the two post streams a mixed feed is built from.
///
/// Both fetches return at most `count` posts ordered by post id in `order`. A source only
/// returns fewer than `count` posts when it has nothing more to give, and "nothing" is an
/// empty vec, never an error.
pub trait PostSource {
    /// Posts written by `user_id`.
    fn own_posts(
        &self,
        user_id: UserId,
        offset: u64,
        count: usize,
        order: Order,
    ) -> impl std::future::Future<Output = Result<Vec<Post>, FeedError>> + Send;

    /// Posts `user_id` has liked, ordered by the liked post's id.
    fn liked_posts(
        &self,
        user_id: UserId,
        offset: u64,
        count: usize,
        order: Order,
    ) -> impl std::future::Future<Output = Result<Vec<Post>, FeedError>> + Send;

    fn own_post_count(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<u64, FeedError>> + Send;

    fn liked_post_count(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<u64, FeedError>> + Send;
}
