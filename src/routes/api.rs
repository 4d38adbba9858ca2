use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{food, homepage, livekit, openai};
use crate::state::AppState;
use std::sync::Arc;

/// Upper bound for uploaded recordings, matching the transcription endpoint's limit
pub const MAX_AUDIO_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Create the API router with protected routes
///
/// Note: Authentication middleware is applied by [`super::create_app_router`]
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        // OpenAI proxies
        .route("/api/openai/realtime-key", get(openai::realtime_key))
        .route("/api/openai/speak", post(openai::speak))
        .route(
            "/api/openai/transcribe",
            post(openai::transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_UPLOAD_BYTES)),
        )
        // LiveKit tokens
        .route("/api/livekit/token", post(livekit::generate_token))
        .route(
            "/api/livekit-native/token",
            get(livekit::generate_native_token_get).post(livekit::generate_native_token),
        )
        .route(
            "/api/livekit-agentserver/token",
            get(livekit::agent_server_status).post(livekit::generate_agent_server_token),
        )
        // Food data
        .route(
            "/api/food/cart",
            get(food::get_cart).delete(food::clear_cart),
        )
        .route(
            "/api/food/orders",
            get(food::list_orders).delete(food::clear_orders),
        )
        .route("/api/data/homepage", get(homepage::get_layout))
        .route("/api/data/homepage/reset", post(homepage::reset_layout))
        .layer(TraceLayer::new_for_http())
}
