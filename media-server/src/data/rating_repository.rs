use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::rating::{Rating, RatingAggregate, RatingValue};

#[derive(Debug, Clone)]
pub(crate) struct RatingUpsert {
    pub(crate) post_id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) user_display_name: String,
    pub(crate) value: RatingValue,
}

/// Pure reduction from a post's rating rows to its aggregate.
pub(crate) type AggregateFn = fn(&[Rating]) -> RatingAggregate;

#[async_trait]
pub(crate) trait RatingRepository: Send + Sync {
    /// Insert-or-replace on the `(post_id, user_id)` unique key in one write.
    async fn upsert_rating(&self, input: RatingUpsert) -> Result<(), DomainError>;

    /// Newest first.
    async fn list_ratings_for_post(&self, post_id: Uuid) -> Result<Vec<Rating>, DomainError>;

    /// Reads every rating row of the post, reduces them with `compute` and
    /// stores the result on the post while holding the post exclusively, so
    /// concurrent recomputes for one post never overwrite each other with a
    /// stale value. Returns `NotFound` when the post is gone.
    async fn recompute_aggregate(
        &self,
        post_id: Uuid,
        compute: AggregateFn,
    ) -> Result<RatingAggregate, DomainError>;
}
