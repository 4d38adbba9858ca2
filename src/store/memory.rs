//! In-process back end.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::collections::HashMap;

use super::types::{CartSummary, OrderSummary, now_timestamp};
use super::{FoodStore, StoreError, StoreResult, StoreStep};

#[derive(Debug, Clone)]
struct Restaurant {
    id: String,
    slug: String,
}

#[derive(Debug, Clone)]
struct StoredCart {
    profile_id: String,
    cart: CartSummary,
}

#[derive(Debug, Clone)]
struct StoredOrder {
    profile_id: String,
    order: OrderSummary,
}

#[derive(Debug, Clone, Default)]
struct Layouts {
    current: Option<Value>,
    default: Option<Value>,
}

#[derive(Debug, Default)]
struct Tables {
    restaurants: Vec<Restaurant>,
    carts: Vec<StoredCart>,
    orders: Vec<StoredOrder>,
    profiles: HashMap<String, Layouts>,
}

/// Process-local [`FoodStore`].
///
/// Used when the server runs with `STORE_BACKEND=memory` and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding one profile with an empty default layout
    pub fn with_profile(profile_id: &str) -> Self {
        let store = Self::new();
        store.set_layouts(profile_id, None, json!({ "sections": [] }));
        store
    }

    pub fn insert_restaurant(&self, id: &str, slug: &str) {
        self.tables.write().restaurants.push(Restaurant {
            id: id.to_string(),
            slug: slug.to_string(),
        });
    }

    pub fn insert_cart(&self, profile_id: &str, cart: CartSummary) {
        self.tables.write().carts.push(StoredCart {
            profile_id: profile_id.to_string(),
            cart,
        });
    }

    pub fn insert_order(&self, profile_id: &str, order: OrderSummary) {
        self.tables.write().orders.push(StoredOrder {
            profile_id: profile_id.to_string(),
            order,
        });
    }

    pub fn set_layouts(&self, profile_id: &str, current: Option<Value>, default: Value) {
        self.tables.write().profiles.insert(
            profile_id.to_string(),
            Layouts {
                current,
                default: Some(default),
            },
        );
    }

    /// Number of orders stored for every profile
    pub fn order_count(&self) -> usize {
        self.tables.read().orders.len()
    }
}

#[async_trait]
impl FoodStore for MemoryStore {
    async fn find_restaurant_id_by_slug(&self, slug: &str) -> StoreResult<Option<String>> {
        Ok(self
            .tables
            .read()
            .restaurants
            .iter()
            .find(|r| r.slug.eq_ignore_ascii_case(slug))
            .map(|r| r.id.clone()))
    }

    async fn active_cart(
        &self,
        profile_id: &str,
        restaurant_id: Option<&str>,
    ) -> StoreResult<Option<CartSummary>> {
        let tables = self.tables.read();
        Ok(tables
            .carts
            .iter()
            .filter(|stored| stored.profile_id == profile_id && stored.cart.status == "active")
            .filter(|stored| restaurant_id.is_none_or(|id| stored.cart.restaurant_id == id))
            .max_by(|a, b| a.cart.updated_at.cmp(&b.cart.updated_at))
            .map(|stored| stored.cart.clone()))
    }

    async fn clear_active_carts(&self, profile_id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let now = now_timestamp();
        let mut cleared = false;
        for stored in tables
            .carts
            .iter_mut()
            .filter(|stored| stored.profile_id == profile_id && stored.cart.status == "active")
        {
            stored.cart.items.clear();
            stored.cart.subtotal = 0.0;
            stored.cart.updated_at = Some(now.clone());
            cleared = true;
        }
        Ok(cleared)
    }

    async fn recent_orders(
        &self,
        profile_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<OrderSummary>> {
        let tables = self.tables.read();
        let mut orders: Vec<OrderSummary> = tables
            .orders
            .iter()
            .filter(|stored| stored.profile_id == profile_id)
            .map(|stored| stored.order.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(limit);
        Ok(orders)
    }

    async fn delete_order(&self, order_id: &str) -> StoreResult<()> {
        self.tables
            .write()
            .orders
            .retain(|stored| stored.order.id != order_id);
        Ok(())
    }

    async fn clear_orders(&self, profile_id: &str) -> StoreResult<usize> {
        let mut tables = self.tables.write();
        let before = tables.orders.len();
        tables.orders.retain(|stored| stored.profile_id != profile_id);
        Ok(before - tables.orders.len())
    }

    async fn homepage_layout(&self, profile_id: &str) -> StoreResult<Value> {
        let tables = self.tables.read();
        let layouts = tables.profiles.get(profile_id).ok_or(StoreError::NotFound {
            step: StoreStep::LoadLayout,
        })?;
        Ok(layouts
            .current
            .clone()
            .or_else(|| layouts.default.clone())
            .unwrap_or(Value::Null))
    }

    async fn reset_homepage_layout(&self, profile_id: &str) -> StoreResult<Value> {
        let mut tables = self.tables.write();
        let layouts = tables
            .profiles
            .get_mut(profile_id)
            .ok_or(StoreError::NotFound {
                step: StoreStep::LoadDefaultLayout,
            })?;
        let layout = layouts.default.clone().unwrap_or(Value::Null);
        layouts.current = Some(layout.clone());
        Ok(layout)
    }
}
