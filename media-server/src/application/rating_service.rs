use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::data::post_repository::PostRepository;
use crate::data::rating_repository::{RatingRepository, RatingUpsert};
use crate::domain::error::DomainError;
use crate::domain::identity::Identity;
use crate::domain::rating::{Rating, RatingAggregate, RatingValue};

const RECOMPUTE_ATTEMPTS: u32 = 3;
const RECOMPUTE_BACKOFF: Duration = Duration::from_millis(50);

pub(crate) struct RatingService<P: PostRepository, R: RatingRepository> {
    posts: P,
    ratings: R,
}

impl<P: PostRepository, R: RatingRepository> RatingService<P, R> {
    pub(crate) fn new(posts: P, ratings: R) -> Self {
        Self { posts, ratings }
    }

    /// Records the caller's rating for a post, replacing any earlier one, and
    /// returns the post's aggregate recomputed from every current rating row.
    ///
    /// The value is checked before anything is read or written. Once the row
    /// is upserted the recompute is retried on store failures; if it still
    /// fails the rating stays recorded and the error is returned.
    pub(crate) async fn submit_rating(
        &self,
        actor: &Identity,
        post_id: Uuid,
        value: i64,
    ) -> Result<RatingAggregate, DomainError> {
        let value = RatingValue::new(value)?;
        if !self.posts.post_exists(post_id).await? {
            return Err(DomainError::NotFound(format!("post id: {post_id}")));
        }

        self.ratings
            .upsert_rating(RatingUpsert {
                post_id,
                user_id: actor.user_id,
                user_display_name: actor.display_name.clone(),
                value,
            })
            .await?;

        let aggregate = self.recompute_with_retry(post_id).await?;
        info!(
            post_id = %post_id,
            user_id = %actor.user_id,
            value = value.get(),
            avg_rating = aggregate.avg_rating,
            rating_count = aggregate.rating_count,
            "rating recorded"
        );
        Ok(aggregate)
    }

    pub(crate) async fn list_ratings(&self, post_id: Uuid) -> Result<Vec<Rating>, DomainError> {
        if !self.posts.post_exists(post_id).await? {
            return Err(DomainError::NotFound(format!("post id: {post_id}")));
        }
        self.ratings.list_ratings_for_post(post_id).await
    }

    async fn recompute_with_retry(&self, post_id: Uuid) -> Result<RatingAggregate, DomainError> {
        let mut attempt = 1;
        loop {
            match self
                .ratings
                .recompute_aggregate(post_id, RatingAggregate::from_ratings)
                .await
            {
                Ok(aggregate) => return Ok(aggregate),
                Err(err) if err.is_transient() && attempt < RECOMPUTE_ATTEMPTS => {
                    warn!(post_id = %post_id, attempt, error = %err, "aggregate recompute failed, retrying");
                    tokio::time::sleep(RECOMPUTE_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
