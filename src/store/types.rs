use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Label used when an option row has no linked choice
pub const FALLBACK_OPTION_LABEL: &str = "Custom option";
/// Name used when a cart item has no linked menu item
pub const FALLBACK_MENU_ITEM_NAME: &str = "Menu item";

/// Coerce a numeric column to `f64`.
///
/// Numbers pass through, numeric strings are parsed (blank strings count as
/// 0), and anything else yields 0.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|n| !n.is_nan())
                    .unwrap_or(0.0)
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Current UTC time as RFC 3339, the format PostgREST returns for timestamptz
pub(crate) fn now_timestamp() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_number).unwrap_or(0.0))
}

pub(crate) fn lenient_quantity<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_number(deserializer).map(|n| n as i64)
}

/// Active cart with its items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub id: String,
    pub restaurant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_name: Option<String>,
    pub status: String,
    pub subtotal: f64,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub menu_item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_item_slug: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub base_price: f64,
    pub total_price: f64,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub options: Vec<CartItemOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemOption {
    pub id: String,
    pub label: String,
    pub price_adjustment: f64,
}

/// Past order with its items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: String,
    pub restaurant_name: Option<String>,
    pub cuisine: Option<String>,
    pub total: f64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub name: Option<String>,
    pub quantity: i64,
    pub total_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(12.5)), 12.5);
        assert_eq!(coerce_number(&json!("8.25")), 8.25);
        assert_eq!(coerce_number(&json!(" 3 ")), 3.0);
        assert_eq!(coerce_number(&json!("")), 0.0);
        assert_eq!(coerce_number(&json!("abc")), 0.0);
        assert_eq!(coerce_number(&Value::Null), 0.0);
        assert_eq!(coerce_number(&json!({"n": 1})), 0.0);
    }

    #[test]
    fn test_cart_summary_wire_shape() {
        let cart = CartSummary {
            id: "cart-1".to_string(),
            restaurant_id: "r-1".to_string(),
            restaurant_slug: None,
            restaurant_name: Some("Taqueria".to_string()),
            status: "active".to_string(),
            subtotal: 0.0,
            updated_at: None,
            items: vec![CartItem {
                id: "ci-1".to_string(),
                menu_item_id: "m-1".to_string(),
                menu_item_slug: None,
                name: FALLBACK_MENU_ITEM_NAME.to_string(),
                quantity: 2,
                base_price: 4.5,
                total_price: 9.0,
                instructions: None,
                options: vec![],
            }],
        };

        let value = serde_json::to_value(&cart).unwrap();
        assert_eq!(value["restaurantId"], "r-1");
        assert_eq!(value["restaurantName"], "Taqueria");
        assert!(value.get("restaurantSlug").is_none());
        assert_eq!(value["updatedAt"], Value::Null);
        assert_eq!(value["items"][0]["menuItemId"], "m-1");
        assert_eq!(value["items"][0]["totalPrice"], 9.0);
        assert!(value["items"][0].get("menuItemSlug").is_none());
        assert_eq!(value["items"][0]["instructions"], Value::Null);
    }
}
