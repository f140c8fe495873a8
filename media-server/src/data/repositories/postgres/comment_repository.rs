use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::map_db_error;
use crate::data::comment_repository::{CommentRepository, NewComment};
use crate::domain::comment::Comment;
use crate::domain::error::DomainError;

#[derive(Debug, Clone)]
pub(crate) struct PostgresCommentRepository {
    pool: PgPool,
}

impl PostgresCommentRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    user_id: Uuid,
    user_display_name: String,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            user_display_name: row.user_display_name,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create_comment(&self, input: NewComment) -> Result<Comment, DomainError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (id, post_id, user_id, user_display_name, text)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, post_id, user_id, user_display_name, text, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.post_id)
        .bind(input.user_id)
        .bind(&input.user_display_name)
        .bind(&input.text)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "post"))?;

        Ok(row.into())
    }

    async fn list_comments(&self, post_id: Uuid, limit: i64) -> Result<Vec<Comment>, DomainError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, post_id, user_id, user_display_name, text, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(post_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "post"))?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }
}
