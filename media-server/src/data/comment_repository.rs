use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::comment::Comment;
use crate::domain::error::DomainError;

#[derive(Debug, Clone)]
pub(crate) struct NewComment {
    pub(crate) post_id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) user_display_name: String,
    pub(crate) text: String,
}

#[async_trait]
pub(crate) trait CommentRepository: Send + Sync {
    async fn create_comment(&self, input: NewComment) -> Result<Comment, DomainError>;
    async fn list_comments(&self, post_id: Uuid, limit: i64) -> Result<Vec<Comment>, DomainError>;
}
