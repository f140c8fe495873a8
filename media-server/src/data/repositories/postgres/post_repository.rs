use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::map_db_error;
use crate::data::post_repository::{NewPost, Pagination, PostRepository};
use crate::domain::error::DomainError;
use crate::domain::post::{MediaKind, Post, PostStats};

#[derive(Debug, Clone)]
pub(crate) struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    creator_id: Uuid,
    media_type: String,
    media_url: String,
    thumbnail_url: String,
    title: String,
    caption: String,
    location: String,
    people_present: Vec<String>,
    tags: Vec<String>,
    views: i64,
    avg_rating: f64,
    rating_count: i64,
    comment_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const POST_COLUMNS: &str = r#"
    id,
    creator_id,
    media_type,
    media_url,
    thumbnail_url,
    title,
    caption,
    location,
    people_present,
    tags,
    views,
    avg_rating,
    rating_count,
    comment_count,
    created_at,
    updated_at
"#;

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
        let sql = format!(
            r#"
            INSERT INTO posts (
                id, creator_id, media_type, media_url, thumbnail_url,
                title, caption, location, people_present, tags
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {POST_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(input.creator_id)
            .bind(input.media_type.as_str())
            .bind(&input.media_url)
            .bind(&input.thumbnail_url)
            .bind(&input.title)
            .bind(&input.caption)
            .bind(&input.location)
            .bind(&input.people_present)
            .bind(&input.tags)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_db_error(err, "creator"))?;

        map_row_to_post(row)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_db_error(err, "post"))?;

        row.map(map_row_to_post).transpose()
    }

    async fn post_exists(&self, id: Uuid) -> Result<bool, DomainError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "post"))?;

        Ok(exists)
    }

    async fn list_posts(&self, pagination: Pagination) -> Result<Vec<Post>, DomainError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            OFFSET $2
            "#
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(i64::from(pagination.limit))
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_db_error(err, "post"))?;

        rows.into_iter().map(map_row_to_post).collect()
    }

    async fn increment_comment_count(&self, id: Uuid) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET comment_count = comment_count + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "post"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("post id: {id}")));
        }
        Ok(())
    }
}

fn map_row_to_post(row: PostRow) -> Result<Post, DomainError> {
    let media_type = row
        .media_type
        .parse::<MediaKind>()
        .map_err(|err| DomainError::Unexpected(err.to_string()))?;

    Ok(Post {
        id: row.id,
        creator_id: row.creator_id,
        media_type,
        media_url: row.media_url,
        thumbnail_url: row.thumbnail_url,
        title: row.title,
        caption: row.caption,
        location: row.location,
        people_present: row.people_present,
        tags: row.tags,
        stats: PostStats {
            views: row.views,
            avg_rating: row.avg_rating,
            rating_count: row.rating_count,
            comment_count: row.comment_count,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
