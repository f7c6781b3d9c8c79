use log::debug;

use crate::interleave::interleave_runs;
use crate::models::{FeedPage, Order, Post, UserId};
use crate::{FeedError, PostSource};

/// Which stream a post came from. Only lives for the duration of one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provenance {
    Own,
    Liked,
}

/// How a page of `count` items starting at `offset` is split between the two streams.
///
/// Even offsets open the page with an own post, odd offsets with a liked post. Since the
/// turn only depends on how many items were already delivered, no session state is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PagePlan {
    pub(crate) own_precedence: bool,
    pub(crate) own_offset: u64,
    pub(crate) own_count: usize,
    pub(crate) liked_offset: u64,
    pub(crate) liked_count: usize,
}

impl PagePlan {
    pub(crate) fn new(offset: u64, count: usize) -> Self {
        let own_precedence = offset % 2 == 0;
        let own_count = if own_precedence {
            count.div_ceil(2)
        } else {
            count / 2
        };
        let own_offset = if own_precedence {
            offset / 2
        } else {
            offset.div_ceil(2)
        };
        PagePlan {
            own_precedence,
            own_offset,
            own_count,
            liked_offset: offset - own_offset,
            liked_count: count - own_count,
        }
    }

    fn offset(&self, provenance: Provenance) -> u64 {
        match provenance {
            Provenance::Own => self.own_offset,
            Provenance::Liked => self.liked_offset,
        }
    }

    fn count(&self, provenance: Provenance) -> usize {
        match provenance {
            Provenance::Own => self.own_count,
            Provenance::Liked => self.liked_count,
        }
    }

    /// Clamps the offset of a stream that holds only `total` posts and hands the
    /// overshoot to the other stream. Returns the stream whose offset moved.
    fn anchor(&mut self, exhausted: Provenance, total: u64) -> Option<Provenance> {
        let overshoot = self.offset(exhausted).checked_sub(total).filter(|d| *d > 0)?;
        match exhausted {
            Provenance::Own => {
                self.own_offset = total;
                self.liked_offset += overshoot;
                Some(Provenance::Liked)
            }
            Provenance::Liked => {
                self.liked_offset = total;
                self.own_offset += overshoot;
                Some(Provenance::Own)
            }
        }
    }
}

/// Builds feeds that alternate between the posts a user wrote and the posts they liked.
#[derive(Debug, Clone)]
pub struct MixedPosts<S> {
    source: S,
}

impl<S: PostSource> MixedPosts<S> {
    pub fn new(source: S) -> Self {
        MixedPosts { source }
    }

    /// Returns `count` posts of `user_id`'s mixed feed, starting after `cursor` delivered
    /// items, together with the cursor of the next page.
    ///
    /// Own and liked posts alternate, newest first. When one stream runs dry the other one
    /// fills the rest of the page. `next_cursor` is `None` once a page comes back short.
    ///
    /// A page normally costs two reads, three when one stream falls short. Once a stream
    /// has run out before `cursor`, up to two count reads and one more fetch are added to
    /// re-anchor the offsets.
    ///
    /// Any source failure fails the whole page.
    pub async fn get_mixed_feed_posts(
        &self,
        user_id: UserId,
        cursor: Option<u64>,
        count: usize,
    ) -> Result<FeedPage, FeedError> {
        if count == 0 {
            return Err(FeedError::invalid("count must be greater than zero"));
        }

        let offset = cursor.unwrap_or(0);
        let mut plan = PagePlan::new(offset, count);
        debug!("Feed plan for user {user_id} at {offset}: {plan:?}");

        let (mut own_posts, mut liked_posts) = tokio::try_join!(
            self.fetch(Provenance::Own, user_id, plan.own_offset, plan.own_count),
            self.fetch(Provenance::Liked, user_id, plan.liked_offset, plan.liked_count),
        )?;

        // The parity schedule assumes both streams are still alive. An empty stream past
        // offset 0 may have run out before this page, in which case its share of earlier
        // pages went to the other stream.
        let (own_total, liked_total) = tokio::try_join!(
            self.total_if_empty(Provenance::Own, user_id, &own_posts, plan.own_offset),
            self.total_if_empty(Provenance::Liked, user_id, &liked_posts, plan.liked_offset),
        )?;
        let moved = match (liked_total, own_total) {
            (Some(total), _) if total < plan.liked_offset => plan.anchor(Provenance::Liked, total),
            (_, Some(total)) if total < plan.own_offset => plan.anchor(Provenance::Own, total),
            _ => None,
        };
        if let Some(provenance) = moved {
            debug!("Re-anchored {provenance:?} posts for user {user_id}: {plan:?}");
            let refetched = self
                .fetch(provenance, user_id, plan.offset(provenance), plan.count(provenance))
                .await?;
            match provenance {
                Provenance::Own => own_posts = refetched,
                Provenance::Liked => liked_posts = refetched,
            }
        }

        if own_posts.len() < plan.own_count && liked_posts.len() >= plan.liked_count {
            let missing = plan.own_count - own_posts.len();
            let from = plan.liked_offset + liked_posts.len() as u64;
            debug!("Backfilling {missing} liked posts for user {user_id} from {from}");
            liked_posts.extend(self.fetch(Provenance::Liked, user_id, from, missing).await?);
        } else if liked_posts.len() < plan.liked_count && own_posts.len() >= plan.own_count {
            let missing = plan.liked_count - liked_posts.len();
            let from = plan.own_offset + own_posts.len() as u64;
            debug!("Backfilling {missing} own posts for user {user_id} from {from}");
            own_posts.extend(self.fetch(Provenance::Own, user_id, from, missing).await?);
        }

        let delivered = own_posts.len() + liked_posts.len();
        let next_cursor = if delivered < count {
            None
        } else {
            Some(
                offset
                    .checked_add(count as u64)
                    .ok_or_else(|| FeedError::invalid("cursor out of range"))?,
            )
        };

        let own = own_posts.into_iter().map(|post| (Provenance::Own, post));
        let liked = liked_posts.into_iter().map(|post| (Provenance::Liked, post));
        let tagged: Vec<(Provenance, Post)> = if plan.own_precedence {
            own.chain(liked).collect()
        } else {
            liked.chain(own).collect()
        };
        let posts = interleave_runs(tagged, |(provenance, _)| *provenance)
            .into_iter()
            .map(|(_, post)| post)
            .collect();

        Ok(FeedPage { posts, next_cursor })
    }

    async fn fetch(
        &self,
        provenance: Provenance,
        user_id: UserId,
        offset: u64,
        count: usize,
    ) -> Result<Vec<Post>, FeedError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        match provenance {
            Provenance::Own => {
                self.source
                    .own_posts(user_id, offset, count, Order::Desc)
                    .await
            }
            Provenance::Liked => {
                self.source
                    .liked_posts(user_id, offset, count, Order::Desc)
                    .await
            }
        }
    }

    async fn total_if_empty(
        &self,
        provenance: Provenance,
        user_id: UserId,
        fetched: &[Post],
        offset: u64,
    ) -> Result<Option<u64>, FeedError> {
        if !fetched.is_empty() || offset == 0 {
            return Ok(None);
        }
        let total = match provenance {
            Provenance::Own => self.source.own_post_count(user_id).await?,
            Provenance::Liked => self.source.liked_post_count(user_id).await?,
        };
        Ok(Some(total))
    }
}

/// Mixes posts grouped by owner so that owners take turns.
pub fn mix_by_owners(posts: Vec<Post>) -> Vec<Post> {
    interleave_runs(posts, |post| post.owner.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_starts_with_own_posts() {
        let plan = PagePlan::new(0, 5);
        assert!(plan.own_precedence);
        assert_eq!((plan.own_offset, plan.own_count), (0, 3));
        assert_eq!((plan.liked_offset, plan.liked_count), (0, 2));
    }

    #[test]
    fn odd_offset_starts_with_liked_posts() {
        let plan = PagePlan::new(3, 2);
        assert!(!plan.own_precedence);
        assert_eq!((plan.own_offset, plan.own_count), (2, 1));
        assert_eq!((plan.liked_offset, plan.liked_count), (1, 1));

        let plan = PagePlan::new(7, 5);
        assert_eq!((plan.own_offset, plan.own_count), (4, 2));
        assert_eq!((plan.liked_offset, plan.liked_count), (3, 3));
    }

    #[test]
    fn offsets_partition_delivered_items() {
        for offset in 0..50u64 {
            for count in 1..10usize {
                let plan = PagePlan::new(offset, count);
                assert_eq!(plan.own_offset + plan.liked_offset, offset);
                assert_eq!(plan.own_count + plan.liked_count, count);
                assert_eq!(plan.own_offset, offset.div_ceil(2));
            }
        }
    }

    #[test]
    fn anchoring_moves_overshoot_to_the_other_stream() {
        let mut plan = PagePlan::new(10, 5);
        assert_eq!((plan.own_offset, plan.liked_offset), (5, 5));

        assert_eq!(plan.anchor(Provenance::Liked, 4), Some(Provenance::Own));
        assert_eq!((plan.own_offset, plan.liked_offset), (6, 4));
    }

    #[test]
    fn anchoring_is_a_no_op_without_overshoot() {
        let mut plan = PagePlan::new(8, 2);
        assert_eq!(plan.anchor(Provenance::Own, 4), None);
        assert_eq!(plan.anchor(Provenance::Own, 9), None);
        assert_eq!(plan, PagePlan::new(8, 2));
    }
}
