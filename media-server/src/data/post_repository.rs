use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::post::{MediaKind, Post};

#[derive(Debug, Clone)]
pub(crate) struct NewPost {
    pub(crate) creator_id: Uuid,
    pub(crate) media_type: MediaKind,
    pub(crate) media_url: String,
    pub(crate) thumbnail_url: String,
    pub(crate) title: String,
    pub(crate) caption: String,
    pub(crate) location: String,
    pub(crate) people_present: Vec<String>,
    pub(crate) tags: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Pagination {
    pub(crate) page: u32,
    pub(crate) limit: u32,
}

impl Pagination {
    pub(crate) fn offset(self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

/// Post half of the media catalog. Rating aggregates are not writable here;
/// see `RatingRepository::recompute_aggregate`.
#[async_trait]
pub(crate) trait PostRepository: Send + Sync {
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, DomainError>;
    async fn post_exists(&self, id: Uuid) -> Result<bool, DomainError>;
    async fn list_posts(&self, pagination: Pagination) -> Result<Vec<Post>, DomainError>;
    async fn increment_comment_count(&self, id: Uuid) -> Result<(), DomainError>;
}
