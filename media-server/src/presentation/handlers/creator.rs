use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::post::{CreatePostRequest, MediaKind};
use crate::infrastructure::blob_sas::UploadGrant;
use crate::presentation::AppState;
use crate::presentation::app_error::AppResult;
use crate::presentation::handlers::media::PostDto;
use crate::presentation::middleware::auth::AuthenticatedUser;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitUploadDto {
    #[validate(length(min = 1, max = 255))]
    pub(crate) file_name: String,
    #[validate(length(max = 255))]
    pub(crate) content_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadGrantDto {
    pub(crate) blob_name: String,
    pub(crate) blob_url: String,
    pub(crate) upload_url: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePostDto {
    pub(crate) media_type: MediaKind,
    #[validate(length(min = 1, max = 2048))]
    pub(crate) media_url: String,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub(crate) thumbnail_url: String,
    #[validate(length(min = 1, max = 120))]
    pub(crate) title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub(crate) caption: String,
    #[serde(default)]
    #[validate(length(max = 120))]
    pub(crate) location: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub(crate) people_present: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub(crate) tags: Vec<String>,
}

impl From<UploadGrant> for UploadGrantDto {
    fn from(grant: UploadGrant) -> Self {
        Self {
            blob_name: grant.blob_name,
            blob_url: grant.blob_url,
            upload_url: grant.upload_url,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/creator/uploads/init",
    tag = "creator",
    security(("bearer_auth" = [])),
    request_body = InitUploadDto,
    responses(
        (status = 200, description = "Write capability for one blob", body = UploadGrantDto),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a creator"),
        (status = 500, description = "Storage is not configured")
    )
)]
pub(crate) async fn init_upload(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(dto): Json<InitUploadDto>,
) -> AppResult<Json<UploadGrantDto>> {
    dto.validate()?;

    let grant = state.catalog_service.init_upload(
        &identity,
        &dto.file_name,
        dto.content_type.as_deref(),
    )?;
    Ok(Json(grant.into()))
}

#[utoipa::path(
    post,
    path = "/api/creator/posts",
    tag = "creator",
    security(("bearer_auth" = [])),
    request_body = CreatePostDto,
    responses(
        (status = 201, description = "Post created", body = PostDto),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a creator or does not own the blob"),
        (status = 503, description = "Store unavailable")
    )
)]
pub(crate) async fn create_post(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(dto): Json<CreatePostDto>,
) -> AppResult<(StatusCode, Json<PostDto>)> {
    dto.validate()?;

    let req = CreatePostRequest {
        media_type: dto.media_type.as_str().to_string(),
        media_url: dto.media_url,
        thumbnail_url: dto.thumbnail_url,
        title: dto.title,
        caption: dto.caption,
        location: dto.location,
        people_present: dto.people_present,
        tags: dto.tags,
    };
    let post = state.catalog_service.create_post(&identity, req).await?;

    Ok((StatusCode::CREATED, Json(post.into())))
}
