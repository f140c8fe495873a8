use axum::middleware;
use axum::{
    Router,
    routing::{get, post},
};

use crate::presentation::AppState;
use crate::presentation::handlers::media::{
    add_comment, get_media, list_comments, list_media, list_ratings, submit_rating,
};
use crate::presentation::middleware::auth::jwt_auth_middleware;

pub(crate) fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_media))
        .route("/{id}", get(get_media))
        .route("/{id}/comments", get(list_comments))
        .route("/{id}/ratings", get(list_ratings));

    let protected = Router::new()
        .route("/{id}/comments", post(add_comment))
        .route("/{id}/rating", post(submit_rating))
        .layer(middleware::from_fn_with_state(state, jwt_auth_middleware));

    public.merge(protected)
}
