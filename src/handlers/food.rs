//! Cart and order routes for the demo profile.
//!
//! Errors use the `{ success: false, message }` body the ordering UI expects.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{
    CartSummary, FoodStore, OrderSummary, RECENT_ORDERS_LIMIT, StoreError, StoreStep,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuery {
    pub restaurant_slug: Option<String>,
    pub restaurant_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    pub cart: Option<CartSummary>,
}

#[derive(Debug, Serialize)]
pub struct ClearCartResponse {
    pub success: bool,
    pub cleared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub success: bool,
    pub orders: Vec<OrderSummary>,
}

#[derive(Debug, Serialize)]
pub struct ClearOrdersResponse {
    pub success: bool,
    pub cleared: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn store<'a>(state: &'a AppState, message: &str) -> AppResult<&'a Arc<dyn FoodStore>> {
    state
        .store
        .as_ref()
        .ok_or_else(|| AppError::action(StatusCode::SERVICE_UNAVAILABLE, message))
}

/// Message shown to the user for a failed store step
fn failure_message(step: Option<StoreStep>, unexpected: &'static str) -> &'static str {
    match step {
        Some(StoreStep::CartLookup) => "Unable to load cart right now.",
        Some(StoreStep::CartItems) => "Unable to load cart items right now.",
        Some(StoreStep::CartOptions) => "Unable to load cart options right now.",
        Some(StoreStep::ActiveCartsLookup) => "Unable to clear the cart right now.",
        Some(StoreStep::DeleteCartItems) => "Unable to clear cart items right now.",
        Some(StoreStep::ResetCartSubtotal) => {
            "Cart items removed but subtotal could not be updated."
        }
        Some(StoreStep::ListOrders) => "Unable to load past orders.",
        Some(StoreStep::DeleteOrderItems) => "Unable to clear that order right now.",
        Some(StoreStep::DeleteOrder) => "Order items cleared but the order could not be removed.",
        Some(StoreStep::OrdersLookup) => "Unable to look up orders to clear.",
        Some(StoreStep::DeleteOrdersItems) => "Unable to clear order items.",
        Some(StoreStep::DeleteOrders) => "Order items removed but orders could not be deleted.",
        _ => unexpected,
    }
}

fn store_failure(route: &str, err: StoreError, unexpected: &'static str) -> AppError {
    error!(route = %route, "{}", err);
    AppError::action(
        StatusCode::INTERNAL_SERVER_ERROR,
        failure_message(err.step(), unexpected),
    )
}

/// Active cart for the demo profile, optionally scoped to one restaurant
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CartQuery>,
) -> AppResult<Json<CartResponse>> {
    let store = store(&state, "Supabase is not configured for cart summaries.")?;
    let unexpected = "Unexpected error while loading the cart.";

    let restaurant_id = match (
        query.restaurant_id.filter(|id| !id.is_empty()),
        query.restaurant_slug.filter(|slug| !slug.is_empty()),
    ) {
        (Some(id), _) => Some(id),
        (None, Some(slug)) => match store.find_restaurant_id_by_slug(&slug).await {
            Ok(id) => id,
            Err(e) => {
                warn!(slug = %slug, "Restaurant lookup failed: {}", e);
                None
            }
        },
        (None, None) => None,
    };

    let cart = store
        .active_cart(&state.config.demo_profile_id, restaurant_id.as_deref())
        .await
        .map_err(|e| store_failure("cart", e, unexpected))?;

    Ok(Json(CartResponse {
        success: true,
        cart,
    }))
}

/// Empty every active cart of the demo profile
pub async fn clear_cart(State(state): State<Arc<AppState>>) -> AppResult<Json<ClearCartResponse>> {
    let store = store(&state, "Supabase is not configured for cart actions.")?;

    let cleared = store
        .clear_active_carts(&state.config.demo_profile_id)
        .await
        .map_err(|e| store_failure("cart", e, "Unexpected error while clearing the cart."))?;

    if cleared {
        info!("Active carts cleared");
        Ok(Json(ClearCartResponse {
            success: true,
            cleared: true,
            message: None,
        }))
    } else {
        Ok(Json(ClearCartResponse {
            success: true,
            cleared: false,
            message: Some("No active cart to clear.".to_string()),
        }))
    }
}

/// Most recent orders of the demo profile
pub async fn list_orders(State(state): State<Arc<AppState>>) -> AppResult<Json<OrdersResponse>> {
    let store = store(&state, "Supabase is not configured for orders.")?;

    let orders = store
        .recent_orders(&state.config.demo_profile_id, RECENT_ORDERS_LIMIT)
        .await
        .map_err(|e| store_failure("orders", e, "Unexpected error while loading orders."))?;

    Ok(Json(OrdersResponse {
        success: true,
        orders,
    }))
}

/// Delete one order (`?orderId=`) or every order of the demo profile
pub async fn clear_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrdersQuery>,
) -> AppResult<Json<ClearOrdersResponse>> {
    let store = store(&state, "Supabase is not configured for orders.")?;
    let unexpected = "Unexpected error while clearing orders.";

    if let Some(order_id) = query.order_id.filter(|id| !id.is_empty()) {
        store
            .delete_order(&order_id)
            .await
            .map_err(|e| store_failure("orders", e, unexpected))?;
        info!(order_id = %order_id, "Order cleared");
        return Ok(Json(ClearOrdersResponse {
            success: true,
            cleared: 1,
            message: None,
        }));
    }

    let cleared = store
        .clear_orders(&state.config.demo_profile_id)
        .await
        .map_err(|e| store_failure("orders", e, unexpected))?;

    if cleared == 0 {
        return Ok(Json(ClearOrdersResponse {
            success: true,
            cleared: 0,
            message: Some("No past orders to clear.".to_string()),
        }));
    }

    info!(cleared, "Orders cleared");
    Ok(Json(ClearOrdersResponse {
        success: true,
        cleared,
        message: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages_by_step() {
        assert_eq!(
            failure_message(Some(StoreStep::CartOptions), "x"),
            "Unable to load cart options right now."
        );
        assert_eq!(
            failure_message(Some(StoreStep::DeleteOrder), "x"),
            "Order items cleared but the order could not be removed."
        );
        assert_eq!(failure_message(None, "fallback"), "fallback");
        assert_eq!(failure_message(Some(StoreStep::LoadLayout), "fallback"), "fallback");
    }
}
