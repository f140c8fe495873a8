use axum::Router;
use axum::routing::get;

use super::AppState;
use super::handlers::health::healthz;

pub(crate) mod auth;
pub(crate) mod creator;
pub(crate) mod media;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/auth", auth::router(state.clone()))
        .nest("/api/creator", creator::router(state.clone()))
        .nest("/api/media", media::router(state.clone()))
        .with_state(state)
}
