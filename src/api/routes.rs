use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the router the render layer talks to
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Render frame and view actions
        .route("/view", get(handlers::get_view))
        .route("/view/hydrate", post(handlers::hydrate))
        .route("/view/refresh", post(handlers::refresh_catalog))
        .route("/view/tab", put(handlers::set_tab))
        .route("/view/notice/dismiss", post(handlers::dismiss_notice))
        // Favorites
        .route("/favorites", get(handlers::list_favorites))
        .route(
            "/favorites/:source/:id",
            get(handlers::get_favorite)
                .put(handlers::save_favorite)
                .delete(handlers::delete_favorite),
        )
        // Continue watching
        .route("/playrecords", get(handlers::list_play_records))
        .route(
            "/playrecords/:source/:id",
            put(handlers::save_play_record).delete(handlers::delete_play_record),
        )
}
