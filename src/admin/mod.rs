//! Administrative API served next to the proxy routes.
//!
//! - `GET /api/settings`: live settings
//! - `POST /api/settings`: partial update, `{"status":"saved"}` on success
//! - `GET /api/metrics`: counter snapshot

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/settings", get(get_settings).post(post_settings))
        .route("/api/metrics", get(get_metrics))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
