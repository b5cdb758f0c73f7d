//! Buyer identity reconciliation.
//!
//! The configured country and customer are the identity every cart should
//! end up with. On creation they fill in whatever the call's own buyer
//! identity leaves out; after a successful creation at most one follow-up
//! update pushes them onto a cart that came back without them.

use pineapple_cart_core::CountryCode;
use secrecy::{ExposeSecret, SecretString};

use crate::types::{CartBuyerIdentityInput, CartSnapshot};

/// Configured buyer identity.
#[derive(Clone, Default)]
pub struct BuyerIdentityTarget {
    /// Country the cart should be in.
    pub country_code: Option<CountryCode>,
    /// Customer the cart should belong to.
    pub customer_access_token: Option<SecretString>,
}

impl std::fmt::Debug for BuyerIdentityTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuyerIdentityTarget")
            .field("country_code", &self.country_code)
            .field(
                "customer_access_token",
                &self.customer_access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl BuyerIdentityTarget {
    /// Whether nothing is configured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.country_code.is_none() && self.customer_access_token.is_none()
    }

    fn token(&self) -> Option<String> {
        self.customer_access_token
            .as_ref()
            .map(|token| token.expose_secret().to_string())
    }

    /// Buyer identity for a creation request.
    ///
    /// Fields set on `explicit` win; configured fields fill the gaps.
    /// Returns `None` when neither side sets anything.
    #[must_use]
    pub fn merge(&self, explicit: Option<CartBuyerIdentityInput>) -> Option<CartBuyerIdentityInput> {
        let mut merged = explicit.unwrap_or_default();
        if merged.country_code.is_none() {
            merged.country_code.clone_from(&self.country_code);
        }
        if merged.customer_access_token.is_none() {
            merged.customer_access_token = self.token();
        }
        (!merged.is_empty()).then_some(merged)
    }

    /// The follow-up update a freshly created cart needs, if any.
    ///
    /// Needed when the cart's country differs from the configured one, or
    /// when a customer is configured and the cart has none. The update
    /// carries only the configured fields.
    #[must_use]
    pub fn fix_for(&self, cart: &CartSnapshot) -> Option<CartBuyerIdentityInput> {
        let identity = &cart.buyer_identity;

        let country_differs = self
            .country_code
            .as_ref()
            .is_some_and(|target| identity.country_code.as_ref() != Some(target));
        let customer_missing =
            self.customer_access_token.is_some() && identity.customer.is_none();

        (country_differs || customer_missing).then(|| CartBuyerIdentityInput {
            country_code: self.country_code.clone(),
            customer_access_token: self.token(),
            ..CartBuyerIdentityInput::default()
        })
    }
}
