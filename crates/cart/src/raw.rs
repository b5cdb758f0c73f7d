//! Server-shaped cart payloads.
//!
//! These mirror what the Storefront API returns for `Cart`: identical to
//! [`CartSnapshot`](crate::types::CartSnapshot) except that `lines` is a
//! paginated connection. See [`conversions`](crate::conversions) for the
//! flattening.

use pineapple_cart_core::CartId;
use serde::{Deserialize, Serialize};

use crate::types::{
    Attribute, CartBuyerIdentity, CartCost, CartDiscountCode, CartLine, CartUserError,
};

/// An edge in a GraphQL connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge<T> {
    /// The item.
    pub node: T,
}

/// A GraphQL connection, queried either through `edges { node }` or `nodes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    /// Items wrapped in edges.
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<Edge<T>>,
    /// Items without edges.
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            edges: Vec::new(),
            nodes: Vec::new(),
        }
    }
}

impl<T> Connection<T> {
    /// Connection holding the given items as edges.
    #[must_use]
    pub fn from_nodes(nodes: impl IntoIterator<Item = T>) -> Self {
        Self {
            edges: nodes.into_iter().map(|node| Edge { node }).collect(),
            nodes: Vec::new(),
        }
    }

    /// Flatten into a plain ordered list.
    ///
    /// `nodes` wins when both are present; they carry the same items.
    #[must_use]
    pub fn into_nodes(self) -> Vec<T> {
        if self.nodes.is_empty() {
            self.edges.into_iter().map(|edge| edge.node).collect()
        } else {
            self.nodes
        }
    }
}

/// A cart as returned by the Storefront API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCart {
    /// Cart ID.
    pub id: CartId,
    /// Checkout URL.
    #[serde(default)]
    pub checkout_url: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Cart note.
    #[serde(default)]
    pub note: Option<String>,
    /// Total item quantity.
    #[serde(default)]
    pub total_quantity: Option<i64>,
    /// Custom attributes.
    #[serde(default)]
    pub attributes: Option<Vec<Attribute>>,
    /// Buyer identity.
    #[serde(default)]
    pub buyer_identity: Option<CartBuyerIdentity>,
    /// Cart cost summary.
    #[serde(default)]
    pub cost: Option<CartCost>,
    /// Applied discount codes.
    #[serde(default)]
    pub discount_codes: Option<Vec<CartDiscountCode>>,
    /// Cart lines.
    #[serde(default)]
    pub lines: Option<Connection<CartLine>>,
}

impl RawCart {
    /// A cart carrying nothing but its ID.
    #[must_use]
    pub fn with_id(id: impl Into<CartId>) -> Self {
        Self {
            id: id.into(),
            checkout_url: None,
            created_at: None,
            updated_at: None,
            note: None,
            total_quantity: None,
            attributes: None,
            buyer_identity: None,
            cost: None,
            discount_codes: None,
            lines: None,
        }
    }
}

/// Payload of every cart mutation root (`cartCreate`, `cartLinesAdd`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMutationPayload {
    /// Resulting cart, `null` when the mutation removed or expired it.
    #[serde(default)]
    pub cart: Option<RawCart>,
    /// Validation errors.
    #[serde(default)]
    pub user_errors: Vec<CartUserError>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_edges() {
        let connection: Connection<u32> =
            serde_json::from_value(serde_json::json!({"edges": [{"node": 1}, {"node": 2}]}))
                .unwrap();
        assert_eq!(connection.into_nodes(), vec![1, 2]);
    }

    #[test]
    fn test_connection_nodes() {
        let connection: Connection<u32> =
            serde_json::from_value(serde_json::json!({"nodes": [3, 4]})).unwrap();
        assert_eq!(connection.into_nodes(), vec![3, 4]);
    }

    #[test]
    fn test_connection_empty_object() {
        let connection: Connection<u32> = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(connection.into_nodes().is_empty());
    }

    #[test]
    fn test_raw_cart_only_requires_id() {
        let cart: RawCart =
            serde_json::from_value(serde_json::json!({"id": "gid://shopify/Cart/c1"})).unwrap();
        assert_eq!(cart, RawCart::with_id("gid://shopify/Cart/c1"));
    }

    #[test]
    fn test_mutation_payload_null_cart() {
        let payload: CartMutationPayload =
            serde_json::from_value(serde_json::json!({"cart": null, "userErrors": []})).unwrap();
        assert!(payload.cart.is_none());
        assert!(payload.user_errors.is_empty());
    }
}
