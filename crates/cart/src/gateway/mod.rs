//! Action gateway: the remote cart operations.
//!
//! # Architecture
//!
//! - [`CartGateway`] is the seam between the state machine and the network.
//!   Each operation resolves to the resulting cart (`None` when the server
//!   removed or expired it) or to a [`GatewayError`] payload.
//! - [`StorefrontGateway`] implements it against the Shopify Storefront API.
//! - Shopify is source of truth - carts are never cached.
//!
//! # Example
//!
//! ```rust,ignore
//! use pineapple_cart::gateway::{CartGateway, StorefrontGateway};
//!
//! let gateway = StorefrontGateway::new(&config.shopify)?;
//! let cart = gateway.cart_create(CartInput::default()).await?;
//! ```

mod queries;
mod storefront;

pub use queries::DEFAULT_CART_FRAGMENT;
pub use storefront::StorefrontGateway;

use async_trait::async_trait;
use pineapple_cart_core::{CartId, CartLineId};
use thiserror::Error;

use crate::raw::RawCart;
use crate::types::{
    AttributeInput, CartBuyerIdentityInput, CartInput, CartLineInput, CartLineUpdateInput,
    CartUserError,
};

/// Outcome of a gateway call: the resulting cart, or the error payload.
pub type GatewayResult = Result<Option<RawCart>, GatewayError>;

/// The remote cart operations consumed by the state machine.
///
/// Implementations never need to disambiguate partial results: when
/// anything went wrong they return `Err`, and any data is ignored.
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Create a cart.
    async fn cart_create(&self, input: CartInput) -> GatewayResult;

    /// Fetch a cart by ID.
    async fn cart_fetch(&self, cart_id: &CartId) -> GatewayResult;

    /// Add lines to a cart.
    async fn cart_line_add(&self, cart_id: &CartId, lines: Vec<CartLineInput>) -> GatewayResult;

    /// Update cart lines.
    async fn cart_line_update(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> GatewayResult;

    /// Remove lines from a cart.
    async fn cart_line_remove(&self, cart_id: &CartId, line_ids: Vec<CartLineId>)
    -> GatewayResult;

    /// Replace the cart note.
    async fn note_update(&self, cart_id: &CartId, note: String) -> GatewayResult;

    /// Update the cart's buyer identity.
    async fn buyer_identity_update(
        &self,
        cart_id: &CartId,
        buyer_identity: CartBuyerIdentityInput,
    ) -> GatewayResult;

    /// Replace the cart attributes.
    async fn cart_attributes_update(
        &self,
        cart_id: &CartId,
        attributes: Vec<AttributeInput>,
    ) -> GatewayResult;

    /// Replace the discount codes.
    async fn discount_codes_update(
        &self,
        cart_id: &CartId,
        discount_codes: Vec<String>,
    ) -> GatewayResult;
}

/// Errors that can come back from a gateway call.
///
/// Recorded verbatim on the controller state, so it is `Clone` and
/// comparable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Mutation rejected the input.
    #[error("User errors: {}", format_user_errors(.0))]
    UserErrors(Vec<CartUserError>),

    /// The response had no payload for the requested root field.
    #[error("Missing `{0}` in response")]
    MissingRoot(String),
}

impl GatewayError {
    /// A single GraphQL error carrying only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::GraphQL(vec![GraphQLError {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }])
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// A GraphQL error returned by the Shopify API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_user_errors(errors: &[CartUserError]) -> String {
    errors
        .iter()
        .map(|e| match &e.code {
            Some(code) => format!("{} ({code})", e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_error_formatting() {
        let err = GatewayError::GraphQL(vec![
            GraphQLError {
                message: "Field not found".to_string(),
                locations: vec![],
                path: vec![],
            },
            GraphQLError {
                message: "Invalid ID".to_string(),
                locations: vec![],
                path: vec![],
            },
        ]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Invalid ID"
        );
    }

    #[test]
    fn test_graphql_error_path_and_location() {
        let err = GatewayError::GraphQL(vec![GraphQLError {
            message: String::new(),
            locations: vec![GraphQLErrorLocation { line: 5, column: 10 }],
            path: vec![
                serde_json::Value::String("cartLinesAdd".to_string()),
                serde_json::Value::Number(0.into()),
            ],
        }]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: path: cartLinesAdd.0 at line 5:10"
        );
    }

    #[test]
    fn test_graphql_error_empty_vec() {
        let err = GatewayError::GraphQL(vec![]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: (no error details provided)"
        );
    }

    #[test]
    fn test_user_errors_formatting() {
        let err = GatewayError::UserErrors(vec![
            CartUserError {
                code: Some("INVALID".to_string()),
                field: Some(vec!["lines".to_string()]),
                message: "Merchandise not found".to_string(),
            },
            CartUserError {
                code: None,
                field: None,
                message: "Quantity too high".to_string(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "User errors: Merchandise not found (INVALID); Quantity too high"
        );
    }

    #[test]
    fn test_message_helper_is_comparable() {
        assert_eq!(
            GatewayError::message("Error creating cart"),
            GatewayError::message("Error creating cart")
        );
        assert_ne!(
            GatewayError::message("a"),
            GatewayError::RateLimited(1)
        );
    }
}
