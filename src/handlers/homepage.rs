use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{FoodStore, StoreError, StoreStep};

#[derive(Debug, Serialize)]
pub struct LayoutResponse {
    pub layout: Value,
}

#[derive(Debug, Serialize)]
pub struct ResetLayoutResponse {
    pub success: bool,
    pub layout: Value,
}

fn store(state: &AppState) -> AppResult<&Arc<dyn FoodStore>> {
    state
        .store
        .as_ref()
        .ok_or_else(|| AppError::internal("Supabase is not configured"))
}

fn layout_failure(route: &str, err: StoreError) -> AppError {
    error!(route = %route, "{}", err);
    let message = match err.step() {
        Some(StoreStep::LoadDefaultLayout) => "Failed to load default layout",
        Some(StoreStep::UpdateLayout) => "Failed to reset layout",
        _ => "Failed to load layout",
    };
    AppError::internal(message)
}

/// Homepage layout of the demo profile
pub async fn get_layout(State(state): State<Arc<AppState>>) -> AppResult<Json<LayoutResponse>> {
    let layout = store(&state)?
        .homepage_layout(&state.config.demo_profile_id)
        .await
        .map_err(|e| layout_failure("homepage", e))?;
    Ok(Json(LayoutResponse { layout }))
}

/// Restore the default layout. Disabled in production.
pub async fn reset_layout(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ResetLayoutResponse>> {
    if state.config.is_production() {
        return Err(AppError::api(
            StatusCode::FORBIDDEN,
            "Debug endpoints disabled in production",
        ));
    }

    let layout = store(&state)?
        .reset_homepage_layout(&state.config.demo_profile_id)
        .await
        .map_err(|e| layout_failure("homepage/reset", e))?;

    info!("Homepage layout reset to default");
    Ok(Json(ResetLayoutResponse {
        success: true,
        layout,
    }))
}
