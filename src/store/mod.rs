//! Food data store.
//!
//! Everything is scoped to a single profile id. [`PostgrestStore`] talks to
//! Supabase over PostgREST; [`MemoryStore`] keeps the same data in process.

mod memory;
mod postgrest;
mod types;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use types::{
    CartItem, CartItemOption, CartSummary, OrderItem, OrderSummary, coerce_number,
};

/// Default number of orders returned by [`FoodStore::recent_orders`]
pub const RECENT_ORDERS_LIMIT: usize = 10;

/// Store step that failed.
///
/// Multi-step operations report the step so callers can tell a partial
/// failure (items deleted, parent row kept) from a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStep {
    RestaurantLookup,
    CartLookup,
    CartItems,
    CartOptions,
    ActiveCartsLookup,
    DeleteCartItems,
    ResetCartSubtotal,
    ListOrders,
    DeleteOrderItems,
    DeleteOrder,
    OrdersLookup,
    DeleteOrdersItems,
    DeleteOrders,
    LoadLayout,
    LoadDefaultLayout,
    UpdateLayout,
}

impl StoreStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreStep::RestaurantLookup => "restaurant lookup",
            StoreStep::CartLookup => "active cart query",
            StoreStep::CartItems => "cart items query",
            StoreStep::CartOptions => "cart item options query",
            StoreStep::ActiveCartsLookup => "active carts lookup",
            StoreStep::DeleteCartItems => "delete cart items",
            StoreStep::ResetCartSubtotal => "reset cart subtotal",
            StoreStep::ListOrders => "fetch orders",
            StoreStep::DeleteOrderItems => "delete order items",
            StoreStep::DeleteOrder => "delete order",
            StoreStep::OrdersLookup => "order list",
            StoreStep::DeleteOrdersItems => "bulk delete order items",
            StoreStep::DeleteOrders => "bulk delete orders",
            StoreStep::LoadLayout => "load layout",
            StoreStep::LoadDefaultLayout => "load default layout",
            StoreStep::UpdateLayout => "update layout",
        }
    }
}

impl std::fmt::Display for StoreStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors returned by store back ends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The back end rejected the request or returned an error body
    #[error("{step} failed: {message}")]
    Query { step: StoreStep, message: String },

    /// The request did not reach the back end
    #[error("{step} failed: network error: {message}")]
    Network { step: StoreStep, message: String },

    /// An expected row does not exist
    #[error("{step} failed: row not found")]
    NotFound { step: StoreStep },

    #[error("Store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub fn query(step: StoreStep, message: impl Into<String>) -> Self {
        StoreError::Query {
            step,
            message: message.into(),
        }
    }

    /// The failing step, if the error came from a store operation
    pub fn step(&self) -> Option<StoreStep> {
        match self {
            StoreError::Query { step, .. }
            | StoreError::Network { step, .. }
            | StoreError::NotFound { step } => Some(*step),
            StoreError::Config(_) => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Data access used by the food and homepage routes.
#[async_trait]
pub trait FoodStore: Send + Sync {
    /// Case-insensitive restaurant lookup by slug
    async fn find_restaurant_id_by_slug(&self, slug: &str) -> StoreResult<Option<String>>;

    /// Most recently updated active cart, optionally for one restaurant
    async fn active_cart(
        &self,
        profile_id: &str,
        restaurant_id: Option<&str>,
    ) -> StoreResult<Option<CartSummary>>;

    /// Empty every active cart of the profile and reset its subtotal.
    ///
    /// Returns `false` when the profile had no active cart.
    async fn clear_active_carts(&self, profile_id: &str) -> StoreResult<bool>;

    /// Newest orders first, with their items
    async fn recent_orders(&self, profile_id: &str, limit: usize)
    -> StoreResult<Vec<OrderSummary>>;

    /// Delete one order and its items
    async fn delete_order(&self, order_id: &str) -> StoreResult<()>;

    /// Delete every order of the profile, returning how many were removed
    async fn clear_orders(&self, profile_id: &str) -> StoreResult<usize>;

    /// Current homepage layout, falling back to the default layout
    async fn homepage_layout(&self, profile_id: &str) -> StoreResult<Value>;

    /// Copy the default layout over the current one and return it
    async fn reset_homepage_layout(&self, profile_id: &str) -> StoreResult<Value>;
}
