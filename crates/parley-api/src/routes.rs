use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::messages;
use crate::middleware::require_auth;
use crate::threads;

/// Full HTTP surface. Routes keep their trailing slashes.
pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register/", post(auth::register))
        .route("/token/", post(auth::obtain_token))
        .route("/token/refresh/", post(auth::refresh_token));

    let protected_routes = Router::new()
        .route("/new_thread/", post(threads::create_thread))
        .route("/threads/", get(threads::list_threads))
        .route(
            "/messages/{thread_id}/",
            get(messages::list_messages)
                .post(messages::send_message)
                .patch(messages::mark_read),
        )
        .route("/unread_msgs/", get(messages::unread_count))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
