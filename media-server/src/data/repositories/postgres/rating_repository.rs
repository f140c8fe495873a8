use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::map_db_error;
use crate::data::rating_repository::{AggregateFn, RatingRepository, RatingUpsert};
use crate::domain::error::DomainError;
use crate::domain::rating::{Rating, RatingAggregate, RatingValue};

#[derive(Debug, Clone)]
pub(crate) struct PostgresRatingRepository {
    pool: PgPool,
}

impl PostgresRatingRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RatingRow {
    post_id: Uuid,
    user_id: Uuid,
    user_display_name: String,
    value: i16,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl RatingRepository for PostgresRatingRepository {
    async fn upsert_rating(&self, input: RatingUpsert) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO ratings (post_id, user_id, user_display_name, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT ratings_post_user_key
            DO UPDATE SET
                value = EXCLUDED.value,
                user_display_name = EXCLUDED.user_display_name,
                updated_at = NOW()
            "#,
        )
        .bind(input.post_id)
        .bind(input.user_id)
        .bind(&input.user_display_name)
        .bind(i16::from(input.value.get()))
        .execute(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "post"))?;

        Ok(())
    }

    async fn list_ratings_for_post(&self, post_id: Uuid) -> Result<Vec<Rating>, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|err| map_db_error(err, "post"))?;
        select_ratings(&mut *conn, post_id).await
    }

    async fn recompute_aggregate(
        &self,
        post_id: Uuid,
        compute: AggregateFn,
    ) -> Result<RatingAggregate, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| map_db_error(err, "post"))?;

        // Row lock serializes recomputes of the same post without blocking the
        // FK checks of concurrent upserts. The ratings read
        // below starts after the lock is granted and sees every committed upsert.
        let locked = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM posts WHERE id = $1 FOR NO KEY UPDATE
            "#,
        )
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|err| map_db_error(err, "post"))?;

        if locked.is_none() {
            return Err(DomainError::NotFound(format!("post id: {post_id}")));
        }

        let ratings = select_ratings(&mut *tx, post_id).await?;
        let aggregate = compute(&ratings);
        set_aggregate(&mut *tx, post_id, aggregate).await?;

        tx.commit()
            .await
            .map_err(|err| map_db_error(err, "post"))?;

        Ok(aggregate)
    }
}

async fn select_ratings(conn: &mut PgConnection, post_id: Uuid) -> Result<Vec<Rating>, DomainError> {
    let rows = sqlx::query_as::<_, RatingRow>(
        r#"
        SELECT
            post_id,
            user_id,
            user_display_name,
            value,
            created_at,
            updated_at
        FROM ratings
        WHERE post_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(post_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|err| map_db_error(err, "post"))?;

    rows.into_iter().map(map_row_to_rating).collect()
}

async fn set_aggregate(
    conn: &mut PgConnection,
    post_id: Uuid,
    aggregate: RatingAggregate,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE posts
        SET avg_rating = $2,
            rating_count = $3,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(post_id)
    .bind(aggregate.avg_rating)
    .bind(aggregate.rating_count)
    .execute(&mut *conn)
    .await
    .map_err(|err| map_db_error(err, "post"))?;

    Ok(())
}

fn map_row_to_rating(row: RatingRow) -> Result<Rating, DomainError> {
    let value = RatingValue::new(i64::from(row.value))
        .map_err(|err| DomainError::Unexpected(err.to_string()))?;
    Ok(Rating {
        post_id: row.post_id,
        user_id: row.user_id,
        user_display_name: row.user_display_name,
        value,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
