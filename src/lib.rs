pub mod auth;
pub mod client;
pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod livekit;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;

// Re-export commonly used items for convenience
pub use self::core::*;
pub use config::ServerConfig;
pub use errors::app_error::{AppError, AppResult};
pub use errors::auth_error::{AuthError, AuthResult};
pub use state::AppState;
