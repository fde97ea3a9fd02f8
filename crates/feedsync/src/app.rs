use std::time::Duration;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    context::USER_ID_HEADER,
    handlers::{
        feed::get_feed,
        feed_ws::feed_ws,
        friends::{add_friend, remove_friend},
        health::{healthz, livez},
        posts::{create_post, get_post},
        session::login,
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static("x-request-id"),
        ]);

    let api_routes = Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{id}", get(get_post))
        .route("/feed", get(get_feed))
        .route("/feed/ws", get(feed_ws))
        .route("/friends/{id}", put(add_friend).delete(remove_friend))
        .route("/session", post(login))
        .layer(cors);

    Router::new()
        .route("/livez", get(livez))
        .route("/healthz", get(healthz))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}
