use std::sync::Arc;

use crate::application::auth_service::AuthService;
use crate::application::catalog_service::CatalogService;
use crate::application::rating_service::RatingService;
use crate::data::repositories::postgres::comment_repository::PostgresCommentRepository;
use crate::data::repositories::postgres::post_repository::PostgresPostRepository;
use crate::data::repositories::postgres::rating_repository::PostgresRatingRepository;
use crate::data::repositories::postgres::user_repository::PostgresUserRepository;

pub(crate) mod app_error;
pub(crate) mod handlers;
pub(crate) mod middleware;
pub(crate) mod openapi;
pub(crate) mod routes;

pub(crate) type PgAuthService = AuthService<PostgresUserRepository>;
pub(crate) type PgCatalogService = CatalogService<PostgresPostRepository, PostgresCommentRepository>;
pub(crate) type PgRatingService = RatingService<PostgresPostRepository, PostgresRatingRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) auth_service: Arc<PgAuthService>,
    pub(crate) catalog_service: Arc<PgCatalogService>,
    pub(crate) rating_service: Arc<PgRatingService>,
}

impl AppState {
    pub(crate) fn new(
        auth_service: Arc<PgAuthService>,
        catalog_service: Arc<PgCatalogService>,
        rating_service: Arc<PgRatingService>,
    ) -> Self {
        Self {
            auth_service,
            catalog_service,
            rating_service,
        }
    }
}
