//! Actions fed to the reducer and the transitions it reports back.

use std::fmt;

use pineapple_cart_core::{CartId, CartLineId, CartStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::{CartGateway, GatewayResult};
use crate::types::{
    AttributeInput, CartBuyerIdentityInput, CartInput, CartLineInput, CartLineUpdateInput,
};

/// The kinds of mutating cart operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartOperation {
    Create,
    LineAdd,
    LineUpdate,
    LineRemove,
    NoteUpdate,
    BuyerIdentityUpdate,
    AttributesUpdate,
    DiscountCodesUpdate,
}

impl CartOperation {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Create,
        Self::LineAdd,
        Self::LineUpdate,
        Self::LineRemove,
        Self::NoteUpdate,
        Self::BuyerIdentityUpdate,
        Self::AttributesUpdate,
        Self::DiscountCodesUpdate,
    ];

    /// Returns the operation name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::LineAdd => "line_add",
            Self::LineUpdate => "line_update",
            Self::LineRemove => "line_remove",
            Self::NoteUpdate => "note_update",
            Self::BuyerIdentityUpdate => "buyer_identity_update",
            Self::AttributesUpdate => "attributes_update",
            Self::DiscountCodesUpdate => "discount_codes_update",
        }
    }
}

impl fmt::Display for CartOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller-issued cart mutation with its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    Create(CartInput),
    LinesAdd(Vec<CartLineInput>),
    LinesUpdate(Vec<CartLineUpdateInput>),
    LinesRemove(Vec<CartLineId>),
    NoteUpdate(String),
    BuyerIdentityUpdate(CartBuyerIdentityInput),
    AttributesUpdate(Vec<AttributeInput>),
    DiscountCodesUpdate(Vec<String>),
}

impl CartCommand {
    /// The operation this command performs against an existing cart.
    #[must_use]
    pub const fn operation(&self) -> CartOperation {
        match self {
            Self::Create(_) => CartOperation::Create,
            Self::LinesAdd(_) => CartOperation::LineAdd,
            Self::LinesUpdate(_) => CartOperation::LineUpdate,
            Self::LinesRemove(_) => CartOperation::LineRemove,
            Self::NoteUpdate(_) => CartOperation::NoteUpdate,
            Self::BuyerIdentityUpdate(_) => CartOperation::BuyerIdentityUpdate,
            Self::AttributesUpdate(_) => CartOperation::AttributesUpdate,
            Self::DiscountCodesUpdate(_) => CartOperation::DiscountCodesUpdate,
        }
    }

    /// Fold the command into a creation input, for when no cart exists yet.
    ///
    /// Line updates and removals have nothing to act on without a cart and
    /// fold to an empty creation.
    #[must_use]
    pub fn into_create_input(self) -> CartInput {
        match self {
            Self::Create(input) => input,
            Self::LinesAdd(lines) => CartInput {
                lines: Some(lines),
                ..CartInput::default()
            },
            Self::LinesUpdate(_) | Self::LinesRemove(_) => CartInput::default(),
            Self::NoteUpdate(note) => CartInput {
                note: Some(note),
                ..CartInput::default()
            },
            Self::BuyerIdentityUpdate(buyer_identity) => CartInput {
                buyer_identity: Some(buyer_identity),
                ..CartInput::default()
            },
            Self::AttributesUpdate(attributes) => CartInput {
                attributes: Some(attributes),
                ..CartInput::default()
            },
            Self::DiscountCodesUpdate(discount_codes) => CartInput {
                discount_codes: Some(discount_codes),
                ..CartInput::default()
            },
        }
    }

    /// The gateway request performing this command against `cart_id`.
    ///
    /// `Create` ignores the cart and starts a fresh one.
    #[must_use]
    pub fn into_request(self, cart_id: CartId) -> CartRequest {
        match self {
            Self::Create(input) => CartRequest::Create(input),
            Self::LinesAdd(lines) => CartRequest::LinesAdd(cart_id, lines),
            Self::LinesUpdate(lines) => CartRequest::LinesUpdate(cart_id, lines),
            Self::LinesRemove(line_ids) => CartRequest::LinesRemove(cart_id, line_ids),
            Self::NoteUpdate(note) => CartRequest::NoteUpdate(cart_id, note),
            Self::BuyerIdentityUpdate(identity) => {
                CartRequest::BuyerIdentityUpdate(cart_id, identity)
            }
            Self::AttributesUpdate(attributes) => {
                CartRequest::AttributesUpdate(cart_id, attributes)
            }
            Self::DiscountCodesUpdate(codes) => CartRequest::DiscountCodesUpdate(cart_id, codes),
        }
    }
}

/// Input to [`CartMachine::reduce`](super::CartMachine::reduce).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Fetch the persisted cart, if initialization is pending.
    StartFetch,
    /// A caller-issued mutation.
    Dispatch(CartCommand),
    /// A gateway call has settled.
    Settle {
        /// Sequence number the request was issued under.
        sequence: u64,
        /// What the gateway returned.
        result: GatewayResult,
    },
}

/// A single gateway call, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartRequest {
    Fetch(CartId),
    Create(CartInput),
    LinesAdd(CartId, Vec<CartLineInput>),
    LinesUpdate(CartId, Vec<CartLineUpdateInput>),
    LinesRemove(CartId, Vec<CartLineId>),
    NoteUpdate(CartId, String),
    BuyerIdentityUpdate(CartId, CartBuyerIdentityInput),
    AttributesUpdate(CartId, Vec<AttributeInput>),
    DiscountCodesUpdate(CartId, Vec<String>),
}

impl CartRequest {
    /// Send the request through `gateway`.
    pub async fn send(self, gateway: &dyn CartGateway) -> GatewayResult {
        match self {
            Self::Fetch(id) => gateway.cart_fetch(&id).await,
            Self::Create(input) => gateway.cart_create(input).await,
            Self::LinesAdd(id, lines) => gateway.cart_line_add(&id, lines).await,
            Self::LinesUpdate(id, lines) => gateway.cart_line_update(&id, lines).await,
            Self::LinesRemove(id, line_ids) => gateway.cart_line_remove(&id, line_ids).await,
            Self::NoteUpdate(id, note) => gateway.note_update(&id, note).await,
            Self::BuyerIdentityUpdate(id, identity) => {
                gateway.buyer_identity_update(&id, identity).await
            }
            Self::AttributesUpdate(id, attributes) => {
                gateway.cart_attributes_update(&id, attributes).await
            }
            Self::DiscountCodesUpdate(id, codes) => gateway.discount_codes_update(&id, codes).await,
        }
    }
}

/// Change to apply to the persisted cart ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEffect {
    Write(CartId),
    Clear,
}

/// How a settle resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The server returned a cart.
    Confirmed,
    /// The server reported no cart.
    Cleared,
    /// The call failed; the error is on the state.
    Failed,
}

/// What the reducer did with an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The action was accepted; send `request` and settle with `sequence`.
    Issue {
        sequence: u64,
        /// The operation whose hooks apply: `Create` for implicit creation,
        /// `None` for the startup fetch.
        operation: Option<CartOperation>,
        request: CartRequest,
    },
    /// A settle was applied.
    Settled {
        storage: Option<StorageEffect>,
        outcome: SettleOutcome,
    },
    /// A settle arrived for a request that is no longer current; ignored.
    Stale,
    /// Nothing to do.
    Unchanged,
}

/// Returned when an action cannot be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("cart is busy ({0}); wait for the pending operation to settle")]
    Busy(CartStatus),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pineapple_cart_core::CountryCode;

    #[test]
    fn test_lines_add_folds_into_create_lines() {
        let lines = vec![CartLineInput::new("gid://shopify/ProductVariant/1")];
        let input = CartCommand::LinesAdd(lines.clone()).into_create_input();
        assert_eq!(input.lines, Some(lines));
        assert!(input.buyer_identity.is_none());
    }

    #[test]
    fn test_buyer_identity_folds_into_create() {
        let identity = CartBuyerIdentityInput {
            email: Some("buyer@example.com".to_string()),
            ..CartBuyerIdentityInput::default()
        };
        let input = CartCommand::BuyerIdentityUpdate(identity.clone()).into_create_input();
        assert_eq!(input.buyer_identity, Some(identity));
    }

    #[test]
    fn test_line_removal_folds_to_empty_create() {
        let input = CartCommand::LinesRemove(vec![CartLineId::new("gid://shopify/CartLine/1")])
            .into_create_input();
        assert_eq!(input, CartInput::default());
    }

    #[test]
    fn test_into_request_targets_cart() {
        let cart_id = CartId::new("gid://shopify/Cart/c1");
        let request =
            CartCommand::NoteUpdate("gift".to_string()).into_request(cart_id.clone());
        assert_eq!(request, CartRequest::NoteUpdate(cart_id.clone(), "gift".to_string()));

        let request = CartCommand::Create(CartInput::default()).into_request(cart_id);
        assert_eq!(request, CartRequest::Create(CartInput::default()));
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(CartOperation::LineAdd.to_string(), "line_add");
        assert_eq!(
            CartCommand::BuyerIdentityUpdate(CartBuyerIdentityInput::country(
                CountryCode::parse("US").unwrap()
            ))
            .operation(),
            CartOperation::BuyerIdentityUpdate
        );
        assert_eq!(CartOperation::ALL.len(), 8);
    }
}
