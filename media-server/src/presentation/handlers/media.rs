use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::application::catalog_service::{ListPostsResult, PostView};
use crate::domain::comment::Comment;
use crate::domain::error::DomainError;
use crate::domain::post::{MediaKind, Post, PostStats};
use crate::domain::rating::{Rating, RatingAggregate};
use crate::presentation::AppState;
use crate::presentation::app_error::AppResult;
use crate::presentation::middleware::auth::AuthenticatedUser;

const DEFAULT_PAGE_LIMIT: u32 = 20;

#[derive(Debug, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub(crate) struct ListMediaQuery {
    /// 1-based page number.
    #[validate(range(min = 1))]
    pub(crate) page: Option<u32>,
    /// Items per page (1..=50).
    #[validate(range(min = 1, max = 50))]
    pub(crate) limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatsDto {
    pub(crate) views: i64,
    pub(crate) avg_rating: f64,
    pub(crate) rating_count: i64,
    pub(crate) comment_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostDto {
    pub(crate) id: Uuid,
    pub(crate) creator_id: Uuid,
    pub(crate) media_type: MediaKind,
    pub(crate) media_url: String,
    pub(crate) thumbnail_url: String,
    pub(crate) title: String,
    pub(crate) caption: String,
    pub(crate) location: String,
    pub(crate) people_present: Vec<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) stats: StatsDto,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// Post as served to viewers, with time-boxed read URLs next to the stored ones.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MediaItemDto {
    #[serde(flatten)]
    pub(crate) post: PostDto,
    pub(crate) media_view_url: String,
    pub(crate) thumbnail_view_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ListMediaResponseDto {
    pub(crate) page: u32,
    pub(crate) limit: u32,
    pub(crate) items: Vec<MediaItemDto>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct AddCommentDto {
    #[validate(length(min = 1, max = 1000))]
    pub(crate) text: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommentDto {
    pub(crate) id: Uuid,
    pub(crate) post_id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) user_display_name: String,
    pub(crate) text: String,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CommentListDto {
    pub(crate) items: Vec<CommentDto>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct SubmitRatingDto {
    /// Star value, 1..=5. Any JSON value is accepted here; non-integers fail
    /// validation.
    #[serde(default)]
    #[schema(value_type = i64, minimum = 1, maximum = 5)]
    pub(crate) value: serde_json::Value,
}

impl SubmitRatingDto {
    fn integer_value(&self) -> Result<i64, DomainError> {
        self.value.as_i64().ok_or(DomainError::Validation {
            field: "value",
            message: "must be an integer between 1 and 5",
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RatingDto {
    pub(crate) user_id: Uuid,
    pub(crate) user_display_name: String,
    pub(crate) value: u8,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct RatingListDto {
    pub(crate) items: Vec<RatingDto>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RatingResultDto {
    pub(crate) ok: bool,
    pub(crate) avg_rating: f64,
    pub(crate) rating_count: i64,
}

impl From<PostStats> for StatsDto {
    fn from(stats: PostStats) -> Self {
        Self {
            views: stats.views,
            avg_rating: stats.avg_rating,
            rating_count: stats.rating_count,
            comment_count: stats.comment_count,
        }
    }
}

impl From<Post> for PostDto {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            creator_id: post.creator_id,
            media_type: post.media_type,
            media_url: post.media_url,
            thumbnail_url: post.thumbnail_url,
            title: post.title,
            caption: post.caption,
            location: post.location,
            people_present: post.people_present,
            tags: post.tags,
            stats: post.stats.into(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

impl From<PostView> for MediaItemDto {
    fn from(view: PostView) -> Self {
        Self {
            post: view.post.into(),
            media_view_url: view.media_view_url,
            thumbnail_view_url: view.thumbnail_view_url,
        }
    }
}

impl From<ListPostsResult> for ListMediaResponseDto {
    fn from(result: ListPostsResult) -> Self {
        Self {
            page: result.page,
            limit: result.limit,
            items: result.items.into_iter().map(MediaItemDto::from).collect(),
        }
    }
}

impl From<Comment> for CommentDto {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            user_display_name: comment.user_display_name,
            text: comment.text,
            created_at: comment.created_at,
        }
    }
}

impl From<Rating> for RatingDto {
    fn from(rating: Rating) -> Self {
        Self {
            user_id: rating.user_id,
            user_display_name: rating.user_display_name,
            value: rating.value.get(),
            created_at: rating.created_at,
        }
    }
}

impl From<RatingAggregate> for RatingResultDto {
    fn from(aggregate: RatingAggregate) -> Self {
        Self {
            ok: true,
            avg_rating: aggregate.avg_rating,
            rating_count: aggregate.rating_count,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/media",
    tag = "media",
    params(ListMediaQuery),
    responses(
        (status = 200, description = "Newest posts first", body = ListMediaResponseDto),
        (status = 400, description = "Validation error"),
        (status = 503, description = "Store unavailable")
    )
)]
pub(crate) async fn list_media(
    State(state): State<AppState>,
    Query(query): Query<ListMediaQuery>,
) -> AppResult<Json<ListMediaResponseDto>> {
    query.validate()?;
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    let result = state.catalog_service.list_posts(page, limit).await?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    get,
    path = "/api/media/{id}",
    tag = "media",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post found", body = MediaItemDto),
        (status = 404, description = "Post not found"),
        (status = 503, description = "Store unavailable")
    )
)]
pub(crate) async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MediaItemDto>> {
    let view = state.catalog_service.get_post(id).await?;
    Ok(Json(view.into()))
}

#[utoipa::path(
    get,
    path = "/api/media/{id}/comments",
    tag = "media",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Newest comments first", body = CommentListDto),
        (status = 503, description = "Store unavailable")
    )
)]
pub(crate) async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CommentListDto>> {
    let comments = state.catalog_service.list_comments(id).await?;
    Ok(Json(CommentListDto {
        items: comments.into_iter().map(CommentDto::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/media/{id}/comments",
    tag = "media",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = AddCommentDto,
    responses(
        (status = 201, description = "Comment added", body = CommentDto),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Post not found")
    )
)]
pub(crate) async fn add_comment(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(dto): Json<AddCommentDto>,
) -> AppResult<(StatusCode, Json<CommentDto>)> {
    dto.validate()?;

    let comment = state
        .catalog_service
        .add_comment(&identity, id, &dto.text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

#[utoipa::path(
    get,
    path = "/api/media/{id}/ratings",
    tag = "media",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Current rating per user, newest first", body = RatingListDto),
        (status = 404, description = "Post not found")
    )
)]
pub(crate) async fn list_ratings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RatingListDto>> {
    let ratings = state.rating_service.list_ratings(id).await?;
    Ok(Json(RatingListDto {
        items: ratings.into_iter().map(RatingDto::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/media/{id}/rating",
    tag = "media",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = SubmitRatingDto,
    responses(
        (status = 200, description = "Rating stored, aggregate recomputed", body = RatingResultDto),
        (status = 400, description = "Value is not an integer in 1..=5"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Post not found"),
        (status = 503, description = "Aggregate recompute failed")
    )
)]
pub(crate) async fn submit_rating(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(dto): Json<SubmitRatingDto>,
) -> AppResult<Json<RatingResultDto>> {
    let aggregate = state
        .rating_service
        .submit_rating(&identity, id, dto.integer_value()?)
        .await?;
    Ok(Json(aggregate.into()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::SubmitRatingDto;
    use crate::domain::error::DomainError;

    fn dto(body: serde_json::Value) -> SubmitRatingDto {
        serde_json::from_value(body).expect("any JSON value is accepted")
    }

    #[test]
    fn integer_value_is_passed_through() {
        assert_eq!(dto(json!({ "value": 4 })).integer_value().expect("integer"), 4);
        assert_eq!(dto(json!({ "value": 9 })).integer_value().expect("integer"), 9);
    }

    #[test]
    fn non_integer_values_are_validation_errors() {
        for body in [
            json!({ "value": 4.5 }),
            json!({ "value": "4" }),
            json!({ "value": null }),
            json!({}),
        ] {
            let err = dto(body).integer_value().expect_err("must be rejected");
            assert!(matches!(err, DomainError::Validation { field: "value", .. }));
        }
    }
}
