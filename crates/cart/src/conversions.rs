//! Cart snapshot translation.
//!
//! Turns a server-shaped [`RawCart`] (or its absence) into the
//! [`CartSnapshot`] exposed to consumers. Pure: no I/O, no state.

use std::collections::HashSet;

use tracing::warn;

use crate::raw::RawCart;
use crate::types::{CartLine, CartSnapshot};

/// Normalize a server cart into a snapshot.
///
/// `None` means the server has no cart (deleted, expired or completed) and
/// yields the empty snapshot. Applying this twice to the same input yields
/// structurally equal output.
#[must_use]
pub fn normalize(raw: Option<RawCart>) -> CartSnapshot {
    raw.map_or_else(CartSnapshot::default, CartSnapshot::from)
}

impl From<RawCart> for CartSnapshot {
    fn from(raw: RawCart) -> Self {
        Self {
            id: Some(raw.id),
            checkout_url: raw.checkout_url,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            note: raw.note.unwrap_or_default(),
            total_quantity: raw.total_quantity.unwrap_or_default(),
            attributes: raw.attributes.unwrap_or_default(),
            buyer_identity: raw.buyer_identity.unwrap_or_default(),
            cost: raw.cost,
            discount_codes: raw.discount_codes.unwrap_or_default(),
            lines: dedupe_lines(raw.lines.unwrap_or_default().into_nodes()),
        }
    }
}

/// Drop repeated line IDs, keeping the first occurrence.
fn dedupe_lines(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut seen = HashSet::with_capacity(lines.len());
    lines
        .into_iter()
        .filter(|line| match &line.id {
            Some(id) if !seen.insert(id.clone()) => {
                warn!(line_id = %id, "Dropping duplicate cart line from server response");
                false
            }
            _ => true,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pineapple_cart_core::{CartId, CountryCode};
    use rust_decimal::Decimal;

    fn raw(value: serde_json::Value) -> RawCart {
        serde_json::from_value(value).unwrap()
    }

    fn full_cart() -> RawCart {
        raw(serde_json::json!({
            "id": "gid://shopify/Cart/c1",
            "checkoutUrl": "https://shop.example/checkout/c1",
            "note": "leave at door",
            "totalQuantity": 3,
            "attributes": [{"key": "gift", "value": "yes"}],
            "buyerIdentity": {"countryCode": "CA"},
            "cost": {"totalAmount": {"amount": "30.00", "currencyCode": "CAD"}},
            "discountCodes": [{"code": "SAVE10", "applicable": true}],
            "lines": {"edges": [
                {"node": {"id": "gid://shopify/CartLine/1", "quantity": 1,
                          "merchandise": {"id": "gid://shopify/ProductVariant/1"}}},
                {"node": {"id": "gid://shopify/CartLine/2", "quantity": 2,
                          "merchandise": {"id": "gid://shopify/ProductVariant/2"}}}
            ]}
        }))
    }

    #[test]
    fn test_normalize_none_is_empty_snapshot() {
        let snapshot = normalize(None);
        assert!(snapshot.id.is_none());
        assert!(snapshot.lines.is_empty());
        assert!(snapshot.attributes.is_empty());
        assert!(snapshot.discount_codes.is_empty());
        assert_eq!(snapshot.note, "");
    }

    #[test]
    fn test_normalize_flattens_lines_in_order() {
        let snapshot = normalize(Some(full_cart()));
        assert_eq!(snapshot.id, Some(CartId::new("gid://shopify/Cart/c1")));
        let ids: Vec<_> = snapshot
            .lines
            .iter()
            .map(|line| line.id.as_ref().unwrap().as_str().to_string())
            .collect();
        assert_eq!(ids, ["gid://shopify/CartLine/1", "gid://shopify/CartLine/2"]);
        assert_eq!(snapshot.note, "leave at door");
        assert_eq!(snapshot.total_quantity, 3);
        assert_eq!(
            snapshot.buyer_identity.country_code,
            Some(CountryCode::parse("CA").unwrap())
        );
        assert_eq!(
            snapshot.cost.unwrap().total_amount.unwrap().amount,
            Decimal::new(3000, 2)
        );
    }

    #[test]
    fn test_normalize_defaults_missing_collections() {
        let snapshot = normalize(Some(RawCart::with_id("gid://shopify/Cart/c1")));
        assert!(snapshot.lines.is_empty());
        assert!(snapshot.attributes.is_empty());
        assert!(snapshot.discount_codes.is_empty());
        assert_eq!(snapshot.buyer_identity, Default::default());
    }

    #[test]
    fn test_normalize_accepts_nodes_connection() {
        let snapshot = normalize(Some(raw(serde_json::json!({
            "id": "gid://shopify/Cart/c1",
            "lines": {"nodes": [
                {"id": "gid://shopify/CartLine/9", "merchandise": {"id": "gid://shopify/ProductVariant/9"}}
            ]}
        }))));
        assert_eq!(snapshot.lines.len(), 1);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        assert_eq!(normalize(Some(full_cart())), normalize(Some(full_cart())));
    }

    #[test]
    fn test_normalize_drops_duplicate_line_ids() {
        let snapshot = normalize(Some(raw(serde_json::json!({
            "id": "gid://shopify/Cart/c1",
            "lines": {"edges": [
                {"node": {"id": "gid://shopify/CartLine/1", "quantity": 1,
                          "merchandise": {"id": "gid://shopify/ProductVariant/1"}}},
                {"node": {"id": "gid://shopify/CartLine/1", "quantity": 5,
                          "merchandise": {"id": "gid://shopify/ProductVariant/1"}}}
            ]}
        }))));
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].quantity, 1);
    }
}
