//! Storefront API implementation of [`CartGateway`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use graphql_client::Response;
use pineapple_cart_core::{CartId, CartLineId};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::queries::{
    CART_ATTRIBUTES_UPDATE, CART_BUYER_IDENTITY_UPDATE, CART_CREATE, CART_DISCOUNT_CODES_UPDATE,
    CART_LINES_ADD, CART_LINES_REMOVE, CART_LINES_UPDATE, CART_NOTE_UPDATE, CART_QUERY,
    CartDocument, DEFAULT_CART_FRAGMENT,
};
use super::{CartGateway, GatewayError, GatewayResult, GraphQLError, GraphQLErrorLocation};
use crate::config::{ConfigError, ShopifyStorefrontConfig};
use crate::raw::{CartMutationPayload, RawCart};
use crate::types::{
    AttributeInput, CartBuyerIdentityInput, CartInput, CartLineInput, CartLineUpdateInput,
};

const PUBLIC_TOKEN_HEADER: &str = "X-Shopify-Storefront-Access-Token";
const PRIVATE_TOKEN_HEADER: &str = "Shopify-Storefront-Private-Token";

/// Gateway backed by the Shopify Storefront API.
///
/// Cheap to clone; clones share one HTTP connection pool.
#[derive(Clone)]
pub struct StorefrontGateway {
    inner: Arc<StorefrontGatewayInner>,
}

#[derive(Clone)]
struct StorefrontGatewayInner {
    client: reqwest::Client,
    endpoint: Url,
    token_header: &'static str,
    access_token: String,
    cart_fragment: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQLRequest<'a> {
    query: &'a str,
    operation_name: &'a str,
    variables: serde_json::Value,
}

impl StorefrontGateway {
    /// Create a gateway for the configured store using the default cart fragment.
    ///
    /// Private access tokens use a different header than public tokens; the
    /// private token wins when both are configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the store domain does not form a valid endpoint.
    pub fn new(config: &ShopifyStorefrontConfig) -> Result<Self, ConfigError> {
        let endpoint = config.graphql_endpoint()?;

        let (token_header, access_token) = match &config.storefront_private_token {
            Some(token) => (PRIVATE_TOKEN_HEADER, token.expose_secret().to_string()),
            None => (PUBLIC_TOKEN_HEADER, config.storefront_public_token.clone()),
        };

        Ok(Self {
            inner: Arc::new(StorefrontGatewayInner {
                client: reqwest::Client::new(),
                endpoint,
                token_header,
                access_token,
                cart_fragment: DEFAULT_CART_FRAGMENT.to_string(),
            }),
        })
    }

    /// Replace the cart fragment spliced into every document.
    ///
    /// The fragment must be named `CartFragment` and typed on `Cart`.
    #[must_use]
    pub fn with_cart_fragment(self, cart_fragment: impl Into<String>) -> Self {
        let inner = Arc::unwrap_or_clone(self.inner);
        Self {
            inner: Arc::new(StorefrontGatewayInner {
                cart_fragment: cart_fragment.into(),
                ..inner
            }),
        }
    }

    /// Execute a GraphQL document.
    async fn execute<T: DeserializeOwned>(
        &self,
        document: &CartDocument,
        variables: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let query = document.render(&self.inner.cart_fragment);
        let request_body = GraphQLRequest {
            query: &query,
            operation_name: document.operation_name,
            variables,
        };

        let response = self
            .inner
            .client
            .post(self.inner.endpoint.clone())
            .header(self.inner.token_header, &self.inner.access_token)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(GatewayError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(status_error(status, &response_text));
        }

        parse_response(&response_text)
    }

    /// Run a cart mutation and unwrap its `{ cart, userErrors }` payload.
    async fn mutate(
        &self,
        document: &CartDocument,
        variables: serde_json::Value,
    ) -> GatewayResult {
        let data: HashMap<String, Option<CartMutationPayload>> =
            self.execute(document, variables).await?;
        take_mutation_cart(data, document.root)
    }
}

/// Transport-level failure for a non-success status, with a body excerpt.
fn status_error(status: reqwest::StatusCode, response_text: &str) -> GatewayError {
    GatewayError::Http(format!(
        "HTTP {status}: {}",
        response_text.chars().take(200).collect::<String>()
    ))
}

/// Parse a GraphQL response body, treating any `errors` as failure.
fn parse_response<T: DeserializeOwned>(response_text: &str) -> Result<T, GatewayError> {
    let response: Response<T> = match serde_json::from_str(response_text) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Shopify GraphQL response"
            );
            return Err(GatewayError::from(e));
        }
    };

    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        debug!(errors = ?errors, "GraphQL errors in response");

        return Err(GatewayError::GraphQL(
            errors
                .into_iter()
                .map(|e| GraphQLError {
                    message: e.message,
                    locations: e.locations.map_or_else(Vec::new, |locs| {
                        locs.into_iter()
                            .map(|l| GraphQLErrorLocation {
                                line: i64::from(l.line),
                                column: i64::from(l.column),
                            })
                            .collect()
                    }),
                    path: e.path.map_or_else(Vec::new, |p| {
                        p.into_iter()
                            .map(|fragment| match fragment {
                                graphql_client::PathFragment::Key(s) => {
                                    serde_json::Value::String(s)
                                }
                                graphql_client::PathFragment::Index(i) => {
                                    serde_json::Value::Number(i.into())
                                }
                            })
                            .collect()
                    }),
                })
                .collect(),
        ));
    }

    response.data.ok_or_else(|| {
        tracing::error!(
            body = %response_text.chars().take(500).collect::<String>(),
            "Shopify GraphQL response has no data and no errors"
        );
        GatewayError::message("No data in response")
    })
}

/// Pull the cart out of a mutation root, failing on `userErrors`.
fn take_mutation_cart(
    mut data: HashMap<String, Option<CartMutationPayload>>,
    root: &str,
) -> GatewayResult {
    let payload = data
        .remove(root)
        .flatten()
        .ok_or_else(|| GatewayError::MissingRoot(root.to_string()))?;

    if !payload.user_errors.is_empty() {
        return Err(GatewayError::UserErrors(payload.user_errors));
    }

    Ok(payload.cart)
}

#[async_trait]
impl CartGateway for StorefrontGateway {
    #[instrument(skip(self, input))]
    async fn cart_create(&self, input: CartInput) -> GatewayResult {
        self.mutate(&CART_CREATE, serde_json::json!({ "input": input }))
            .await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn cart_fetch(&self, cart_id: &CartId) -> GatewayResult {
        let mut data: HashMap<String, Option<RawCart>> = self
            .execute(&CART_QUERY, serde_json::json!({ "id": cart_id }))
            .await?;
        Ok(data.remove(CART_QUERY.root).flatten())
    }

    #[instrument(skip(self, lines), fields(cart_id = %cart_id, count = lines.len()))]
    async fn cart_line_add(&self, cart_id: &CartId, lines: Vec<CartLineInput>) -> GatewayResult {
        self.mutate(
            &CART_LINES_ADD,
            serde_json::json!({ "cartId": cart_id, "lines": lines }),
        )
        .await
    }

    #[instrument(skip(self, lines), fields(cart_id = %cart_id, count = lines.len()))]
    async fn cart_line_update(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> GatewayResult {
        self.mutate(
            &CART_LINES_UPDATE,
            serde_json::json!({ "cartId": cart_id, "lines": lines }),
        )
        .await
    }

    #[instrument(skip(self, line_ids), fields(cart_id = %cart_id, count = line_ids.len()))]
    async fn cart_line_remove(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> GatewayResult {
        self.mutate(
            &CART_LINES_REMOVE,
            serde_json::json!({ "cartId": cart_id, "lineIds": line_ids }),
        )
        .await
    }

    #[instrument(skip(self, note), fields(cart_id = %cart_id))]
    async fn note_update(&self, cart_id: &CartId, note: String) -> GatewayResult {
        self.mutate(
            &CART_NOTE_UPDATE,
            serde_json::json!({ "cartId": cart_id, "note": note }),
        )
        .await
    }

    #[instrument(skip(self, buyer_identity), fields(cart_id = %cart_id))]
    async fn buyer_identity_update(
        &self,
        cart_id: &CartId,
        buyer_identity: CartBuyerIdentityInput,
    ) -> GatewayResult {
        self.mutate(
            &CART_BUYER_IDENTITY_UPDATE,
            serde_json::json!({ "cartId": cart_id, "buyerIdentity": buyer_identity }),
        )
        .await
    }

    #[instrument(skip(self, attributes), fields(cart_id = %cart_id))]
    async fn cart_attributes_update(
        &self,
        cart_id: &CartId,
        attributes: Vec<AttributeInput>,
    ) -> GatewayResult {
        self.mutate(
            &CART_ATTRIBUTES_UPDATE,
            serde_json::json!({ "cartId": cart_id, "attributes": attributes }),
        )
        .await
    }

    #[instrument(skip(self, discount_codes), fields(cart_id = %cart_id))]
    async fn discount_codes_update(
        &self,
        cart_id: &CartId,
        discount_codes: Vec<String>,
    ) -> GatewayResult {
        self.mutate(
            &CART_DISCOUNT_CODES_UPDATE,
            serde_json::json!({ "cartId": cart_id, "discountCodes": discount_codes }),
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config(private_token: Option<&str>) -> ShopifyStorefrontConfig {
        ShopifyStorefrontConfig {
            store: "test.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            storefront_public_token: "public".to_string(),
            storefront_private_token: private_token.map(SecretString::from),
        }
    }

    fn mutation_data(value: serde_json::Value) -> HashMap<String, Option<CartMutationPayload>> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_public_token_header() {
        let gateway = StorefrontGateway::new(&config(None)).unwrap();
        assert_eq!(gateway.inner.token_header, PUBLIC_TOKEN_HEADER);
        assert_eq!(gateway.inner.access_token, "public");
        assert_eq!(
            gateway.inner.endpoint.as_str(),
            "https://test.myshopify.com/api/2026-01/graphql.json"
        );
    }

    #[test]
    fn test_private_token_wins() {
        let gateway = StorefrontGateway::new(&config(Some("private"))).unwrap();
        assert_eq!(gateway.inner.token_header, PRIVATE_TOKEN_HEADER);
        assert_eq!(gateway.inner.access_token, "private");
    }

    #[test]
    fn test_with_cart_fragment() {
        let gateway = StorefrontGateway::new(&config(None))
            .unwrap()
            .with_cart_fragment("fragment CartFragment on Cart { id }");
        assert_eq!(
            gateway.inner.cart_fragment,
            "fragment CartFragment on Cart { id }"
        );
    }

    #[test]
    fn test_non_success_status_is_http_error() {
        let body = format!("upstream unavailable {}", "x".repeat(300));
        let err = status_error(reqwest::StatusCode::BAD_GATEWAY, &body);
        let GatewayError::Http(message) = err else {
            panic!("expected an HTTP error, got {err:?}");
        };
        assert!(message.starts_with("HTTP 502 Bad Gateway: upstream unavailable"));
        assert_eq!(message.len(), "HTTP 502 Bad Gateway: ".len() + 200);
    }

    #[test]
    fn test_parse_response_errors_win_over_data() {
        let body = r#"{
            "data": {"cart": {"id": "gid://shopify/Cart/c1"}},
            "errors": [{"message": "Throttled", "path": ["cart", 0], "locations": [{"line": 2, "column": 3}]}]
        }"#;
        let err = parse_response::<HashMap<String, Option<RawCart>>>(body).unwrap_err();
        assert_eq!(
            err,
            GatewayError::GraphQL(vec![GraphQLError {
                message: "Throttled".to_string(),
                locations: vec![GraphQLErrorLocation { line: 2, column: 3 }],
                path: vec![
                    serde_json::Value::String("cart".to_string()),
                    serde_json::Value::Number(0.into()),
                ],
            }])
        );
    }

    #[test]
    fn test_parse_response_without_data() {
        let err = parse_response::<HashMap<String, Option<RawCart>>>("{}").unwrap_err();
        assert_eq!(err, GatewayError::message("No data in response"));
    }

    #[test]
    fn test_parse_response_invalid_json() {
        let err = parse_response::<HashMap<String, Option<RawCart>>>("<html>").unwrap_err();
        assert!(matches!(err, GatewayError::Parse(_)));
    }

    #[test]
    fn test_take_mutation_cart() {
        let data = mutation_data(serde_json::json!({
            "cartLinesAdd": {"cart": {"id": "gid://shopify/Cart/c1"}, "userErrors": []}
        }));
        let cart = take_mutation_cart(data, "cartLinesAdd").unwrap();
        assert_eq!(cart, Some(RawCart::with_id("gid://shopify/Cart/c1")));
    }

    #[test]
    fn test_take_mutation_cart_null_cart() {
        let data = mutation_data(serde_json::json!({
            "cartLinesRemove": {"cart": null, "userErrors": []}
        }));
        assert_eq!(take_mutation_cart(data, "cartLinesRemove").unwrap(), None);
    }

    #[test]
    fn test_take_mutation_cart_user_errors() {
        let data = mutation_data(serde_json::json!({
            "cartLinesAdd": {
                "cart": {"id": "gid://shopify/Cart/c1"},
                "userErrors": [{"code": "INVALID", "field": ["lines"], "message": "Bad line"}]
            }
        }));
        let err = take_mutation_cart(data, "cartLinesAdd").unwrap_err();
        assert!(matches!(err, GatewayError::UserErrors(ref errors) if errors.len() == 1));
    }

    #[test]
    fn test_take_mutation_cart_missing_root() {
        let data = mutation_data(serde_json::json!({"cartCreate": null}));
        assert_eq!(
            take_mutation_cart(data, "cartCreate").unwrap_err(),
            GatewayError::MissingRoot("cartCreate".to_string())
        );
    }
}
