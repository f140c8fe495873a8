use axum::middleware;
use axum::{Router, routing::post};

use crate::presentation::AppState;
use crate::presentation::handlers::creator::{create_post, init_upload};
use crate::presentation::middleware::auth::jwt_auth_middleware;

/// Everything under `/api/creator` needs a bearer token; the role check
/// happens in the catalog service.
pub(crate) fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/uploads/init", post(init_upload))
        .route("/posts", post(create_post))
        .layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}
