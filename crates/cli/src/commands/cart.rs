//! Cart commands.
//!
//! Each command opens a controller on the persisted cart, performs at most
//! one action and prints the resulting snapshot as JSON.

use std::sync::Arc;

use pineapple_cart::{
    AttributeInput, CartBuyerIdentityInput, CartController, CartIdStore, CartInput,
    CartLineInput, CartLineUpdateInput, CartOptions, ConfigError, DispatchError,
    FileCartIdStore, GatewayError, StoreError, StorefrontConfig,
};
use pineapple_cart_core::{CartLineId, CountryCode, CountryCodeError};
use tracing::info;

/// Errors surfaced by cart commands.
#[derive(Debug, thiserror::Error)]
pub enum CartCliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Dispatch(#[from] DispatchError),

    #[error("cart request failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("cart ID store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to render cart: {0}")]
    Output(#[from] serde_json::Error),

    #[error("invalid attribute `{0}`, expected key=value")]
    InvalidAttribute(String),

    #[error("invalid country: {0}")]
    InvalidCountry(#[from] CountryCodeError),
}

/// Open a controller on the persisted cart and fetch it.
async fn open(config: &StorefrontConfig) -> Result<CartController, CartCliError> {
    let store = Arc::new(FileCartIdStore::new(&config.cart_id_store_path));
    let controller =
        CartController::storefront(&config.shopify, store, CartOptions::from_config(config))?;
    controller.initialize().await;
    Ok(controller)
}

/// Print the controller's snapshot, or its recorded error.
fn report(controller: &CartController) -> Result<(), CartCliError> {
    let state = controller.state();
    if let Some(error) = state.error {
        return Err(error.into());
    }

    let rendered = serde_json::to_string_pretty(&state.snapshot)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}

fn parse_country(country: Option<String>) -> Result<Option<CountryCode>, CartCliError> {
    Ok(country.as_deref().map(CountryCode::parse).transpose()?)
}

fn parse_attribute(raw: &str) -> Result<AttributeInput, CartCliError> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| AttributeInput::new(key, value))
        .ok_or_else(|| CartCliError::InvalidAttribute(raw.to_string()))
}

/// Print the current cart.
pub async fn show(config: &StorefrontConfig) -> Result<(), CartCliError> {
    let controller = open(config).await?;
    report(&controller)
}

/// Create a new cart.
pub async fn create(
    config: &StorefrontConfig,
    note: Option<String>,
    country: Option<String>,
) -> Result<(), CartCliError> {
    let buyer_identity = parse_country(country)?.map(CartBuyerIdentityInput::country);
    let controller = open(config).await?;
    controller
        .cart_create(CartInput {
            note,
            buyer_identity,
            ..CartInput::default()
        })
        .await?;
    info!(cart_id = ?controller.state().cart_id(), "Created cart");
    report(&controller)
}

/// Add a line.
pub async fn add(
    config: &StorefrontConfig,
    merchandise_id: String,
    quantity: Option<i64>,
) -> Result<(), CartCliError> {
    let mut line = CartLineInput::new(merchandise_id);
    line.quantity = quantity;

    let controller = open(config).await?;
    controller.lines_add(vec![line]).await?;
    report(&controller)
}

/// Update a line.
pub async fn update(
    config: &StorefrontConfig,
    line_id: String,
    quantity: Option<i64>,
    merchandise_id: Option<String>,
) -> Result<(), CartCliError> {
    let mut line = CartLineUpdateInput::new(line_id);
    line.quantity = quantity;
    if let Some(merchandise_id) = merchandise_id {
        line = line.with_merchandise(merchandise_id);
    }

    let controller = open(config).await?;
    controller.lines_update(vec![line]).await?;
    report(&controller)
}

/// Remove lines.
pub async fn remove(config: &StorefrontConfig, line_ids: Vec<String>) -> Result<(), CartCliError> {
    let line_ids = line_ids.into_iter().map(CartLineId::from).collect();
    let controller = open(config).await?;
    controller.lines_remove(line_ids).await?;
    report(&controller)
}

/// Replace the note.
pub async fn note(config: &StorefrontConfig, note: String) -> Result<(), CartCliError> {
    let controller = open(config).await?;
    controller.note_update(note).await?;
    report(&controller)
}

/// Update the buyer identity.
pub async fn buyer(
    config: &StorefrontConfig,
    email: Option<String>,
    phone: Option<String>,
    country: Option<String>,
) -> Result<(), CartCliError> {
    let buyer_identity = CartBuyerIdentityInput {
        email,
        phone,
        country_code: parse_country(country)?,
        customer_access_token: None,
    };

    let controller = open(config).await?;
    controller.buyer_identity_update(buyer_identity).await?;
    report(&controller)
}

/// Replace the attributes.
pub async fn attributes(config: &StorefrontConfig, raw: &[String]) -> Result<(), CartCliError> {
    let attributes = raw
        .iter()
        .map(|attribute| parse_attribute(attribute))
        .collect::<Result<Vec<_>, _>>()?;

    let controller = open(config).await?;
    controller.cart_attributes_update(attributes).await?;
    report(&controller)
}

/// Replace the discount codes.
pub async fn discount(config: &StorefrontConfig, codes: Vec<String>) -> Result<(), CartCliError> {
    let controller = open(config).await?;
    controller.discount_codes_update(codes).await?;
    report(&controller)
}

/// Forget the persisted cart ID without touching the remote cart.
pub fn forget(config: &StorefrontConfig) -> Result<(), CartCliError> {
    let store = FileCartIdStore::new(&config.cart_id_store_path);
    store.clear()?;
    info!(path = %store.path().display(), "Forgot stored cart");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attribute() {
        let attribute = parse_attribute("gift=yes").unwrap();
        assert_eq!(attribute, AttributeInput::new("gift", "yes"));

        let attribute = parse_attribute("message=a=b").unwrap();
        assert_eq!(attribute.value, "a=b");

        assert!(matches!(
            parse_attribute("novalue"),
            Err(CartCliError::InvalidAttribute(_))
        ));
        assert!(matches!(
            parse_attribute("=value"),
            Err(CartCliError::InvalidAttribute(_))
        ));
    }

    #[test]
    fn test_parse_country() {
        assert_eq!(parse_country(None).unwrap(), None);
        assert_eq!(
            parse_country(Some("ca".to_string())).unwrap(),
            Some(CountryCode::parse("CA").unwrap())
        );
        assert!(matches!(
            parse_country(Some("Canada".to_string())),
            Err(CartCliError::InvalidCountry(_))
        ));
    }
}
