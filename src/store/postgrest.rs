//! Supabase PostgREST back end.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use zeroize::Zeroize;

use super::types::{
    CartItem, CartItemOption, CartSummary, FALLBACK_MENU_ITEM_NAME, FALLBACK_OPTION_LABEL,
    OrderItem, OrderSummary, lenient_number, lenient_quantity, now_timestamp,
};
use super::{FoodStore, StoreError, StoreResult, StoreStep};

const REST_PATH: &str = "/rest/v1";
const SCHEMA: &str = "public";

/// Embedded relation, returned by PostgREST as an object or a one-element array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Relation<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Relation<T> {
    fn into_first(self) -> Option<T> {
        match self {
            Relation::Many(rows) => rows.into_iter().next(),
            Relation::One(row) => Some(row),
        }
    }
}

fn first_of<T>(relation: Option<Relation<T>>) -> Option<T> {
    relation.and_then(Relation::into_first)
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct SlugName {
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChoiceLabel {
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CartRow {
    id: String,
    #[serde(default)]
    restaurant_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    subtotal: f64,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    restaurant: Option<Relation<SlugName>>,
}

#[derive(Debug, Deserialize)]
struct CartItemRow {
    id: String,
    #[serde(default)]
    menu_item_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_quantity")]
    quantity: i64,
    #[serde(default, deserialize_with = "lenient_number")]
    base_price: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    total_price: f64,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    menu_item: Option<Relation<SlugName>>,
}

#[derive(Debug, Deserialize)]
struct CartItemOptionRow {
    id: String,
    cart_item_id: String,
    #[serde(default, deserialize_with = "lenient_number")]
    price_adjustment: f64,
    #[serde(default)]
    choice: Option<Relation<ChoiceLabel>>,
}

#[derive(Debug, Deserialize)]
struct OrderItemRow {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_quantity")]
    quantity: i64,
    #[serde(default, deserialize_with = "lenient_number")]
    total_price: f64,
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    id: String,
    #[serde(default)]
    restaurant_name: Option<String>,
    #[serde(default)]
    cuisine: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    total: f64,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    order_items: Option<Vec<OrderItemRow>>,
}

#[derive(Debug, Deserialize)]
struct LayoutRow {
    #[serde(default)]
    current_layout: Option<Value>,
    #[serde(default)]
    default_layout: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

/// `in.("a","b")` filter with each value quoted
fn in_list(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

/// Store backed by Supabase's PostgREST API, authenticated with the service role key.
pub struct PostgrestStore {
    http: reqwest::Client,
    rest_url: String,
    service_role_key: String,
}

impl std::fmt::Debug for PostgrestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestStore")
            .field("rest_url", &self.rest_url)
            .finish_non_exhaustive()
    }
}

impl Drop for PostgrestStore {
    fn drop(&mut self) {
        self.service_role_key.zeroize();
    }
}

impl PostgrestStore {
    pub fn new(
        http: reqwest::Client,
        supabase_url: &str,
        service_role_key: impl Into<String>,
    ) -> StoreResult<Self> {
        let base = supabase_url.trim().trim_end_matches('/');
        url::Url::parse(base)
            .map_err(|e| StoreError::Config(format!("Invalid SUPABASE_URL: {e}")))?;
        Ok(Self {
            http,
            rest_url: format!("{base}{REST_PATH}"),
            service_role_key: service_role_key.into(),
        })
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        let profile_header = if method == reqwest::Method::GET {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .header(profile_header, SCHEMA)
    }

    async fn send(step: StoreStep, builder: reqwest::RequestBuilder) -> StoreResult<String> {
        let response = builder.send().await.map_err(|e| StoreError::Network {
            step,
            message: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| StoreError::Network {
            step,
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<PostgrestErrorBody>(&text)
                .ok()
                .and_then(|body| match (body.code, body.message) {
                    (Some(code), Some(message)) => Some(format!("{code}: {message}")),
                    (None, Some(message)) => Some(message),
                    _ => None,
                })
                .unwrap_or_else(|| format!("HTTP {status}: {text}"));
            warn!(step = %step, status = %status, "PostgREST request failed: {}", message);
            return Err(StoreError::query(step, message));
        }

        Ok(text)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        step: StoreStep,
        table: &str,
        query: &[(&str, String)],
    ) -> StoreResult<Vec<T>> {
        debug!(table = %table, step = %step, "PostgREST select");
        let text = Self::send(step, self.request(reqwest::Method::GET, table).query(query)).await?;
        serde_json::from_str(&text).map_err(|e| StoreError::query(step, e.to_string()))
    }

    async fn delete(&self, step: StoreStep, table: &str, query: &[(&str, String)]) -> StoreResult<()> {
        debug!(table = %table, step = %step, "PostgREST delete");
        Self::send(
            step,
            self.request(reqwest::Method::DELETE, table)
                .query(query)
                .header("Prefer", "return=minimal"),
        )
        .await
        .map(|_| ())
    }

    async fn update(
        &self,
        step: StoreStep,
        table: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> StoreResult<()> {
        debug!(table = %table, step = %step, "PostgREST update");
        Self::send(
            step,
            self.request(reqwest::Method::PATCH, table)
                .query(query)
                .header("Prefer", "return=minimal")
                .json(body),
        )
        .await
        .map(|_| ())
    }

    async fn cart_options(
        &self,
        item_ids: &[String],
    ) -> StoreResult<HashMap<String, Vec<CartItemOption>>> {
        let mut options: HashMap<String, Vec<CartItemOption>> = HashMap::new();
        if item_ids.is_empty() {
            return Ok(options);
        }

        let rows: Vec<CartItemOptionRow> = self
            .select(
                StoreStep::CartOptions,
                "fc_cart_item_options",
                &[
                    (
                        "select",
                        "id,cart_item_id,price_adjustment,choice:option_choice_id(label)".to_string(),
                    ),
                    ("cart_item_id", in_list(item_ids)),
                ],
            )
            .await?;

        for row in rows {
            let label = first_of(row.choice)
                .and_then(|choice| choice.label)
                .unwrap_or_else(|| FALLBACK_OPTION_LABEL.to_string());
            options.entry(row.cart_item_id).or_default().push(CartItemOption {
                id: row.id,
                label,
                price_adjustment: row.price_adjustment,
            });
        }
        Ok(options)
    }

    async fn profile_ids(
        &self,
        step: StoreStep,
        table: &str,
        profile_id: &str,
        active_only: bool,
    ) -> StoreResult<Vec<String>> {
        let mut query = vec![("select", "id".to_string()), ("profile_id", eq(profile_id))];
        if active_only {
            query.push(("status", eq("active")));
        }
        let rows: Vec<IdRow> = self.select(step, table, &query).await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    async fn layout_row(&self, step: StoreStep, profile_id: &str, columns: &str) -> StoreResult<LayoutRow> {
        let rows: Vec<LayoutRow> = self
            .select(
                step,
                "mvnte_profiles",
                &[("select", columns.to_string()), ("id", eq(profile_id))],
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or(StoreError::NotFound { step })
    }
}

#[async_trait]
impl FoodStore for PostgrestStore {
    async fn find_restaurant_id_by_slug(&self, slug: &str) -> StoreResult<Option<String>> {
        let rows: Vec<IdRow> = self
            .select(
                StoreStep::RestaurantLookup,
                "fc_restaurants",
                &[
                    ("select", "id".to_string()),
                    ("slug", format!("ilike.{slug}")),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| row.id))
    }

    async fn active_cart(
        &self,
        profile_id: &str,
        restaurant_id: Option<&str>,
    ) -> StoreResult<Option<CartSummary>> {
        let mut query = vec![
            (
                "select",
                "id,restaurant_id,status,subtotal,updated_at,restaurant:restaurant_id(slug,name)"
                    .to_string(),
            ),
            ("profile_id", eq(profile_id)),
            ("status", eq("active")),
            ("order", "updated_at.desc".to_string()),
            ("limit", "1".to_string()),
        ];
        if let Some(restaurant_id) = restaurant_id {
            query.push(("restaurant_id", eq(restaurant_id)));
        }

        let carts: Vec<CartRow> = self.select(StoreStep::CartLookup, "fc_carts", &query).await?;
        let Some(cart) = carts.into_iter().next() else {
            return Ok(None);
        };

        let items: Vec<CartItemRow> = self
            .select(
                StoreStep::CartItems,
                "fc_cart_items",
                &[
                    (
                        "select",
                        "id,cart_id,menu_item_id,quantity,base_price,total_price,instructions,menu_item:menu_item_id(slug,name)"
                            .to_string(),
                    ),
                    ("cart_id", eq(&cart.id)),
                ],
            )
            .await?;

        let item_ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        let mut options = self.cart_options(&item_ids).await?;

        let restaurant = first_of(cart.restaurant).unwrap_or_default();
        let items = items
            .into_iter()
            .map(|item| {
                let menu_item = first_of(item.menu_item).unwrap_or_default();
                CartItem {
                    options: options.remove(&item.id).unwrap_or_default(),
                    id: item.id,
                    menu_item_id: item.menu_item_id.unwrap_or_default(),
                    menu_item_slug: menu_item.slug,
                    name: menu_item
                        .name
                        .unwrap_or_else(|| FALLBACK_MENU_ITEM_NAME.to_string()),
                    quantity: item.quantity,
                    base_price: item.base_price,
                    total_price: item.total_price,
                    instructions: item.instructions,
                }
            })
            .collect();

        Ok(Some(CartSummary {
            id: cart.id,
            restaurant_id: cart.restaurant_id.unwrap_or_default(),
            restaurant_slug: restaurant.slug,
            restaurant_name: restaurant.name,
            status: cart.status.unwrap_or_default(),
            subtotal: cart.subtotal,
            updated_at: cart.updated_at,
            items,
        }))
    }

    async fn clear_active_carts(&self, profile_id: &str) -> StoreResult<bool> {
        let cart_ids = self
            .profile_ids(StoreStep::ActiveCartsLookup, "fc_carts", profile_id, true)
            .await?;
        if cart_ids.is_empty() {
            return Ok(false);
        }

        self.delete(
            StoreStep::DeleteCartItems,
            "fc_cart_items",
            &[("cart_id", in_list(&cart_ids))],
        )
        .await?;

        self.update(
            StoreStep::ResetCartSubtotal,
            "fc_carts",
            &[("id", in_list(&cart_ids))],
            &json!({ "subtotal": 0, "updated_at": now_timestamp() }),
        )
        .await?;

        Ok(true)
    }

    async fn recent_orders(
        &self,
        profile_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<OrderSummary>> {
        let rows: Vec<OrderRow> = self
            .select(
                StoreStep::ListOrders,
                "fc_orders",
                &[
                    (
                        "select",
                        "id,restaurant_name,cuisine,total,created_at,order_items:fc_order_items(id,name,quantity,total_price)"
                            .to_string(),
                    ),
                    ("profile_id", eq(profile_id)),
                    ("order", "created_at.desc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|order| OrderSummary {
                id: order.id,
                restaurant_name: order.restaurant_name,
                cuisine: order.cuisine,
                total: order.total,
                created_at: order.created_at,
                items: order
                    .order_items
                    .unwrap_or_default()
                    .into_iter()
                    .map(|item| OrderItem {
                        id: item.id,
                        name: item.name,
                        quantity: item.quantity,
                        total_price: item.total_price,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn delete_order(&self, order_id: &str) -> StoreResult<()> {
        self.delete(
            StoreStep::DeleteOrderItems,
            "fc_order_items",
            &[("order_id", eq(order_id))],
        )
        .await?;
        self.delete(StoreStep::DeleteOrder, "fc_orders", &[("id", eq(order_id))])
            .await
    }

    async fn clear_orders(&self, profile_id: &str) -> StoreResult<usize> {
        let order_ids = self
            .profile_ids(StoreStep::OrdersLookup, "fc_orders", profile_id, false)
            .await?;
        if order_ids.is_empty() {
            return Ok(0);
        }

        self.delete(
            StoreStep::DeleteOrdersItems,
            "fc_order_items",
            &[("order_id", in_list(&order_ids))],
        )
        .await?;
        self.delete(
            StoreStep::DeleteOrders,
            "fc_orders",
            &[("id", in_list(&order_ids))],
        )
        .await?;

        Ok(order_ids.len())
    }

    async fn homepage_layout(&self, profile_id: &str) -> StoreResult<Value> {
        let row = self
            .layout_row(StoreStep::LoadLayout, profile_id, "current_layout,default_layout")
            .await?;
        Ok(row
            .current_layout
            .or(row.default_layout)
            .unwrap_or(Value::Null))
    }

    async fn reset_homepage_layout(&self, profile_id: &str) -> StoreResult<Value> {
        let row = self
            .layout_row(StoreStep::LoadDefaultLayout, profile_id, "default_layout")
            .await?;
        let layout = row.default_layout.unwrap_or(Value::Null);

        self.update(
            StoreStep::UpdateLayout,
            "mvnte_profiles",
            &[("id", eq(profile_id))],
            &json!({ "current_layout": layout, "updated_at": now_timestamp() }),
        )
        .await?;

        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PROFILE: &str = "00000000-0000-0000-0000-000000000001";

    fn store(server: &MockServer) -> PostgrestStore {
        PostgrestStore::new(reqwest::Client::new(), &server.uri(), "service-key").unwrap()
    }

    #[test]
    fn test_in_list_quotes_values() {
        assert_eq!(
            in_list(&["a".to_string(), "b".to_string()]),
            "in.(\"a\",\"b\")"
        );
    }

    #[test]
    fn test_relation_accepts_object_or_array() {
        let one: Relation<SlugName> =
            serde_json::from_value(json!({"slug": "tacos", "name": "Tacos"})).unwrap();
        assert_eq!(one.into_first().unwrap().slug.as_deref(), Some("tacos"));

        let many: Relation<SlugName> =
            serde_json::from_value(json!([{"slug": "pho", "name": "Pho"}])).unwrap();
        assert_eq!(many.into_first().unwrap().name.as_deref(), Some("Pho"));
    }

    #[tokio::test]
    async fn test_restaurant_lookup_is_case_insensitive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fc_restaurants"))
            .and(query_param("slug", "ilike.Taco-Town"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "r-1"}])))
            .mount(&server)
            .await;

        let id = store(&server)
            .find_restaurant_id_by_slug("Taco-Town")
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("r-1"));
    }

    #[tokio::test]
    async fn test_active_cart_assembles_items_and_options() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fc_carts"))
            .and(query_param("profile_id", format!("eq.{PROFILE}")))
            .and(query_param("status", "eq.active"))
            .and(query_param("restaurant_id", "eq.r-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "cart-1",
                "restaurant_id": "r-1",
                "status": "active",
                "subtotal": "18.50",
                "updated_at": "2024-05-01T12:00:00+00:00",
                "restaurant": {"slug": "taco-town", "name": "Taco Town"}
            }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fc_cart_items"))
            .and(query_param("cart_id", "eq.cart-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "ci-1",
                    "cart_id": "cart-1",
                    "menu_item_id": "m-1",
                    "quantity": 2,
                    "base_price": 7.5,
                    "total_price": "16.00",
                    "instructions": "no onions",
                    "menu_item": [{"slug": "al-pastor", "name": "Al Pastor Taco"}]
                },
                {
                    "id": "ci-2",
                    "cart_id": "cart-1",
                    "menu_item_id": "m-2",
                    "quantity": 1,
                    "base_price": null,
                    "total_price": 2.5,
                    "instructions": null,
                    "menu_item": null
                }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fc_cart_item_options"))
            .and(query_param("cart_item_id", "in.(\"ci-1\",\"ci-2\")"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "o-1", "cart_item_id": "ci-1", "price_adjustment": "0.50", "choice": {"label": "Extra salsa"}},
                {"id": "o-2", "cart_item_id": "ci-1", "price_adjustment": null, "choice": null}
            ])))
            .mount(&server)
            .await;

        let cart = store(&server)
            .active_cart(PROFILE, Some("r-1"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(cart.id, "cart-1");
        assert_eq!(cart.subtotal, 18.5);
        assert_eq!(cart.restaurant_slug.as_deref(), Some("taco-town"));
        assert_eq!(cart.items.len(), 2);

        let first = &cart.items[0];
        assert_eq!(first.name, "Al Pastor Taco");
        assert_eq!(first.total_price, 16.0);
        assert_eq!(first.options.len(), 2);
        assert_eq!(first.options[0].label, "Extra salsa");
        assert_eq!(first.options[0].price_adjustment, 0.5);
        assert_eq!(first.options[1].label, FALLBACK_OPTION_LABEL);

        let second = &cart.items[1];
        assert_eq!(second.name, FALLBACK_MENU_ITEM_NAME);
        assert_eq!(second.base_price, 0.0);
        assert!(second.options.is_empty());
    }

    #[tokio::test]
    async fn test_active_cart_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fc_carts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(store(&server).active_cart(PROFILE, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cart_items_error_reports_step() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fc_carts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "cart-1", "restaurant_id": "r-1", "status": "active", "subtotal": 0
            }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fc_cart_items"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "42703", "message": "column does not exist"
            })))
            .mount(&server)
            .await;

        let err = store(&server).active_cart(PROFILE, None).await.unwrap_err();
        assert_eq!(err.step(), Some(StoreStep::CartItems));
        assert!(err.to_string().contains("column does not exist"));
    }

    #[tokio::test]
    async fn test_clear_active_carts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fc_carts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "c1"}, {"id": "c2"}])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/fc_cart_items"))
            .and(query_param("cart_id", "in.(\"c1\",\"c2\")"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/fc_carts"))
            .and(query_param("id", "in.(\"c1\",\"c2\")"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        assert!(store(&server).clear_active_carts(PROFILE).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_active_carts_nothing_to_clear() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fc_carts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(!store(&server).clear_active_carts(PROFILE).await.unwrap());
    }

    #[tokio::test]
    async fn test_recent_orders_maps_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fc_orders"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "o-1",
                "restaurant_name": "Pho House",
                "cuisine": "Vietnamese",
                "total": "24.10",
                "created_at": "2024-04-01T18:00:00+00:00",
                "order_items": [{"id": "oi-1", "name": "Pho", "quantity": 2, "total_price": 22}]
            }])))
            .mount(&server)
            .await;

        let orders = store(&server).recent_orders(PROFILE, 10).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total, 24.1);
        assert_eq!(orders[0].items[0].total_price, 22.0);
        assert_eq!(orders[0].items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_delete_order_partial_failure() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/fc_order_items"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/fc_orders"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "conflict"})))
            .mount(&server)
            .await;

        let err = store(&server).delete_order("o-1").await.unwrap_err();
        assert_eq!(err.step(), Some(StoreStep::DeleteOrder));
    }

    #[tokio::test]
    async fn test_clear_orders_counts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/fc_orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "a"}, {"id": "b"}, {"id": "c"}])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/fc_order_items"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/fc_orders"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert_eq!(store(&server).clear_orders(PROFILE).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_homepage_layout_fallback_and_missing_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/mvnte_profiles"))
            .and(query_param("id", format!("eq.{PROFILE}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "current_layout": null,
                "default_layout": {"sections": ["hero"]}
            }])))
            .mount(&server)
            .await;

        let layout = store(&server).homepage_layout(PROFILE).await.unwrap();
        assert_eq!(layout, json!({"sections": ["hero"]}));

        let missing = store(&server).homepage_layout("nobody").await;
        assert!(matches!(
            missing,
            Err(StoreError::Query { .. }) | Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reset_homepage_layout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/mvnte_profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "default_layout": {"sections": ["hero", "orders"]}
            }])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/mvnte_profiles"))
            .and(header("content-profile", "public"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let layout = store(&server).reset_homepage_layout(PROFILE).await.unwrap();
        assert_eq!(layout, json!({"sections": ["hero", "orders"]}));
    }
}
