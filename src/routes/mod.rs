pub mod api;

use axum::{Router, middleware, routing::get};
use std::sync::Arc;

use crate::handlers::api::health_check;
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Assemble the application router: public health check plus the API routes
/// behind [`auth_middleware`].
///
/// CORS, rate limiting and security headers are added by the binary.
pub fn create_app_router(state: Arc<AppState>) -> Router {
    let protected_routes = api::create_api_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let public_routes = Router::new().route("/", get(health_check));

    public_routes.merge(protected_routes).with_state(state)
}
