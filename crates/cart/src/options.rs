//! Controller configuration.

use std::sync::Arc;

use pineapple_cart_core::CountryCode;
use secrecy::SecretString;

use crate::callbacks::CartCallbacks;
use crate::config::StorefrontConfig;
use crate::machine::CartOperation;
use crate::raw::RawCart;
use crate::reconcile::BuyerIdentityTarget;

/// Options for a [`CartController`](crate::CartController).
///
/// # Example
///
/// ```rust,ignore
/// let options = CartOptions::default()
///     .with_country_code(CountryCode::parse("CA")?)
///     .on_complete(CartOperation::LineAdd, || println!("added"));
/// ```
#[derive(Clone, Default)]
pub struct CartOptions {
    /// Initial cart. Takes precedence over any persisted cart ID.
    pub data: Option<RawCart>,
    /// Country new carts are created in. `US` when unset.
    pub country_code: Option<CountryCode>,
    /// Customer new carts are associated with.
    pub customer_access_token: Option<SecretString>,
    /// Custom `fragment CartFragment on Cart`, used by the Storefront gateway.
    pub cart_fragment: Option<String>,
    /// Lifecycle hooks.
    pub callbacks: CartCallbacks,
}

impl std::fmt::Debug for CartOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartOptions")
            .field("data", &self.data.as_ref().map(|cart| &cart.id))
            .field("country_code", &self.country_code)
            .field(
                "customer_access_token",
                &self.customer_access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cart_fragment", &self.cart_fragment.is_some())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl CartOptions {
    /// Options carrying the buyer identity and fragment from `config`.
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self {
            country_code: config.country_code.clone(),
            customer_access_token: config.customer_access_token.clone(),
            cart_fragment: config.cart_fragment.clone(),
            ..Self::default()
        }
    }

    /// Seed the controller with a cart.
    #[must_use]
    pub fn with_data(mut self, data: RawCart) -> Self {
        self.data = Some(data);
        self
    }

    /// Create carts in `country_code`.
    #[must_use]
    pub fn with_country_code(mut self, country_code: CountryCode) -> Self {
        self.country_code = Some(country_code);
        self
    }

    /// Associate new carts with a customer.
    #[must_use]
    pub fn with_customer_access_token(mut self, token: impl Into<String>) -> Self {
        self.customer_access_token = Some(SecretString::from(token.into()));
        self
    }

    /// Use a custom cart fragment.
    #[must_use]
    pub fn with_cart_fragment(mut self, cart_fragment: impl Into<String>) -> Self {
        self.cart_fragment = Some(cart_fragment.into());
        self
    }

    /// Register the hook fired when `operation` is accepted.
    #[must_use]
    pub fn on_start(
        mut self,
        operation: CartOperation,
        hook: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.hooks_mut(operation).on_start = Some(Arc::new(hook));
        self
    }

    /// Register the hook fired when `operation` settles.
    #[must_use]
    pub fn on_complete(
        mut self,
        operation: CartOperation,
        hook: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.hooks_mut(operation).on_complete = Some(Arc::new(hook));
        self
    }

    /// The buyer identity carts should end up with.
    ///
    /// The country falls back to [`CountryCode::default`] when unset.
    #[must_use]
    pub fn buyer_identity_target(&self) -> BuyerIdentityTarget {
        BuyerIdentityTarget {
            country_code: Some(self.country_code.clone().unwrap_or_default()),
            customer_access_token: self.customer_access_token.clone(),
        }
    }
}
