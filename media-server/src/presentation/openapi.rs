use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::post::MediaKind;
use crate::domain::user::Role;
use crate::presentation::handlers::auth::{
    AuthResponseDto, IdentityDto, LoginDto, MeResponseDto, SignupDto, UserDto,
};
use crate::presentation::handlers::creator::{CreatePostDto, InitUploadDto, UploadGrantDto};
use crate::presentation::handlers::health::HealthzResponse;
use crate::presentation::handlers::media::{
    AddCommentDto, CommentDto, CommentListDto, ListMediaResponseDto, MediaItemDto, PostDto,
    RatingDto, RatingListDto, RatingResultDto, StatsDto, SubmitRatingDto,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::handlers::health::healthz,
        crate::presentation::handlers::auth::signup,
        crate::presentation::handlers::auth::login,
        crate::presentation::handlers::auth::me,
        crate::presentation::handlers::creator::init_upload,
        crate::presentation::handlers::creator::create_post,
        crate::presentation::handlers::media::list_media,
        crate::presentation::handlers::media::get_media,
        crate::presentation::handlers::media::list_comments,
        crate::presentation::handlers::media::add_comment,
        crate::presentation::handlers::media::list_ratings,
        crate::presentation::handlers::media::submit_rating
    ),
    components(
        schemas(
            HealthzResponse,
            Role,
            MediaKind,
            SignupDto,
            LoginDto,
            UserDto,
            AuthResponseDto,
            IdentityDto,
            MeResponseDto,
            InitUploadDto,
            UploadGrantDto,
            CreatePostDto,
            StatsDto,
            PostDto,
            MediaItemDto,
            ListMediaResponseDto,
            AddCommentDto,
            CommentDto,
            CommentListDto,
            SubmitRatingDto,
            RatingDto,
            RatingListDto,
            RatingResultDto
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Accounts and bearer tokens"),
        (name = "creator", description = "Upload delegation and publishing"),
        (name = "media", description = "Catalog reads, comments and ratings")
    ),
    modifiers(&SecurityAddon)
)]
pub(crate) struct ApiDoc;

pub(crate) struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.take().unwrap_or_default();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        openapi.components = Some(components);
    }
}
