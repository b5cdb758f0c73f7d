//! Domain types for the cart snapshot and mutation inputs.
//!
//! The snapshot types deserialize directly from Storefront API JSON. Because
//! callers may swap in their own cart fragment, every field other than the
//! identifiers is optional or defaulted.

use std::fmt;

use pineapple_cart_core::{CartId, CartLineId, CountryCode, MerchandiseId, Money, SellingPlanId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Shared Types
// =============================================================================

/// Custom attribute (key-value pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute key.
    pub key: String,
    /// Attribute value.
    #[serde(default)]
    pub value: Option<String>,
}

impl From<AttributeInput> for Attribute {
    fn from(input: AttributeInput) -> Self {
        Self {
            key: input.key,
            value: Some(input.value),
        }
    }
}

/// Product or variant image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Shopify image ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Image URL.
    pub url: String,
    /// Alt text for accessibility.
    #[serde(default)]
    pub alt_text: Option<String>,
    /// Image width in pixels.
    #[serde(default)]
    pub width: Option<i64>,
    /// Image height in pixels.
    #[serde(default)]
    pub height: Option<i64>,
}

/// Selected option on a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Option name (e.g., "Size", "Color").
    pub name: String,
    /// Selected value (e.g., "Large", "Blue").
    pub value: String,
}

// =============================================================================
// Cart Line Types
// =============================================================================

/// Simplified product info for cart merchandise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMerchandiseProduct {
    /// Product ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Product handle.
    #[serde(default)]
    pub handle: Option<String>,
    /// Product title.
    #[serde(default)]
    pub title: Option<String>,
    /// Vendor.
    #[serde(default)]
    pub vendor: Option<String>,
}

/// Merchandise in a cart line (product variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMerchandise {
    /// Variant ID.
    pub id: MerchandiseId,
    /// Variant title.
    #[serde(default)]
    pub title: Option<String>,
    /// SKU.
    #[serde(default)]
    pub sku: Option<String>,
    /// Whether available for sale.
    #[serde(default)]
    pub available_for_sale: Option<bool>,
    /// Whether requires shipping.
    #[serde(default)]
    pub requires_shipping: Option<bool>,
    /// Current price.
    #[serde(default)]
    pub price: Option<Money>,
    /// Compare-at price.
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    /// Selected options.
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    /// Variant image.
    #[serde(default)]
    pub image: Option<Image>,
    /// Parent product info.
    #[serde(default)]
    pub product: Option<CartMerchandiseProduct>,
}

impl CartMerchandise {
    /// Merchandise known only by its variant ID, used for lines the server
    /// has not confirmed yet.
    #[must_use]
    pub const fn provisional(id: MerchandiseId) -> Self {
        Self {
            id,
            title: None,
            sku: None,
            available_for_sale: None,
            requires_shipping: None,
            price: None,
            compare_at_price: None,
            selected_options: Vec::new(),
            image: None,
            product: None,
        }
    }
}

/// Cost for a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineCost {
    /// Price per unit.
    #[serde(default)]
    pub amount_per_quantity: Option<Money>,
    /// Compare-at price per unit.
    #[serde(default)]
    pub compare_at_amount_per_quantity: Option<Money>,
    /// Subtotal (before discounts).
    #[serde(default)]
    pub subtotal_amount: Option<Money>,
    /// Total (after discounts).
    #[serde(default)]
    pub total_amount: Option<Money>,
}

/// Discount allocation on a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountAllocation {
    /// Amount discounted.
    pub discounted_amount: Money,
}

/// A line item in the cart.
///
/// `id` is `None` only for optimistic lines appended before the server
/// confirmed them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Cart line ID.
    #[serde(default)]
    pub id: Option<CartLineId>,
    /// Quantity.
    #[serde(default)]
    pub quantity: i64,
    /// Custom attributes.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Line cost.
    #[serde(default)]
    pub cost: Option<CartLineCost>,
    /// Product variant.
    pub merchandise: CartMerchandise,
    /// Discount amounts applied to this line.
    #[serde(default)]
    pub discount_allocations: Vec<DiscountAllocation>,
}

impl CartLine {
    /// Whether the server has confirmed this line.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.id.is_some()
    }
}

// =============================================================================
// Cart Types
// =============================================================================

/// Cart cost summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCost {
    /// Subtotal before tax/shipping.
    #[serde(default)]
    pub subtotal_amount: Option<Money>,
    /// Total amount.
    #[serde(default)]
    pub total_amount: Option<Money>,
    /// Total tax amount.
    #[serde(default)]
    pub total_tax_amount: Option<Money>,
    /// Total duty amount.
    #[serde(default)]
    pub total_duty_amount: Option<Money>,
}

/// Discount code applied to cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartDiscountCode {
    /// The discount code.
    pub code: String,
    /// Whether the code is applicable.
    #[serde(default)]
    pub applicable: bool,
}

/// Customer info in buyer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCustomer {
    /// Customer ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Email.
    #[serde(default)]
    pub email: Option<String>,
    /// First name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Buyer identity for the cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartBuyerIdentity {
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Country code.
    #[serde(default)]
    pub country_code: Option<CountryCode>,
    /// Logged-in customer.
    #[serde(default)]
    pub customer: Option<CartCustomer>,
}

/// The normalized, UI-facing cart.
///
/// `id` is `None` before the first creation and after the server reported
/// the cart as deleted or expired. `lines` never holds two lines with the
/// same ID.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    /// Cart ID.
    #[serde(default)]
    pub id: Option<CartId>,
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
    pub note: String,
    /// Total item quantity, as reported by the server.
    #[serde(default)]
    pub total_quantity: i64,
    /// Custom attributes.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Buyer identity.
    #[serde(default)]
    pub buyer_identity: CartBuyerIdentity,
    /// Cart cost summary.
    #[serde(default)]
    pub cost: Option<CartCost>,
    /// Applied discount codes.
    #[serde(default)]
    pub discount_codes: Vec<CartDiscountCode>,
    /// Cart lines, in server order.
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// Find a line by its ID.
    #[must_use]
    pub fn line(&self, id: &CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id.as_ref() == Some(id))
    }
}

// =============================================================================
// Input Types
// =============================================================================

/// Input for custom attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInput {
    /// Attribute key.
    pub key: String,
    /// Attribute value.
    pub value: String,
}

impl AttributeInput {
    /// Create an attribute input.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Input for adding a line to cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    /// Product variant ID.
    pub merchandise_id: MerchandiseId,
    /// Quantity to add (the API defaults to 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    /// Custom attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeInput>>,
    /// Selling plan ID (for subscriptions).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selling_plan_id: Option<SellingPlanId>,
}

impl CartLineInput {
    /// Line input for a single unit of a variant.
    #[must_use]
    pub fn new(merchandise_id: impl Into<MerchandiseId>) -> Self {
        Self {
            merchandise_id: merchandise_id.into(),
            quantity: None,
            attributes: None,
            selling_plan_id: None,
        }
    }

    /// Set the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

/// Input for updating a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineUpdateInput {
    /// Cart line ID.
    pub id: CartLineId,
    /// New quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    /// New merchandise ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchandise_id: Option<MerchandiseId>,
    /// New attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeInput>>,
    /// New selling plan ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selling_plan_id: Option<SellingPlanId>,
}

impl CartLineUpdateInput {
    /// Update input touching no field yet.
    #[must_use]
    pub fn new(id: impl Into<CartLineId>) -> Self {
        Self {
            id: id.into(),
            quantity: None,
            merchandise_id: None,
            attributes: None,
            selling_plan_id: None,
        }
    }

    /// Set the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Swap the line to another variant.
    #[must_use]
    pub fn with_merchandise(mut self, merchandise_id: impl Into<MerchandiseId>) -> Self {
        self.merchandise_id = Some(merchandise_id.into());
        self
    }
}

/// Input for the cart's buyer identity.
///
/// Implements `Debug` manually to redact the customer access token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartBuyerIdentityInput {
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Country code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<CountryCode>,
    /// Storefront customer access token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_access_token: Option<String>,
}

impl CartBuyerIdentityInput {
    /// Buyer identity carrying only a country.
    #[must_use]
    pub fn country(country_code: CountryCode) -> Self {
        Self {
            country_code: Some(country_code),
            ..Self::default()
        }
    }

    /// Whether no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone.is_none()
            && self.country_code.is_none()
            && self.customer_access_token.is_none()
    }
}

impl fmt::Debug for CartBuyerIdentityInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartBuyerIdentityInput")
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("country_code", &self.country_code)
            .field(
                "customer_access_token",
                &self.customer_access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Input for creating a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartInput {
    /// Lines to start with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<CartLineInput>>,
    /// Cart note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Custom attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeInput>>,
    /// Discount codes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_codes: Option<Vec<String>>,
    /// Buyer identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_identity: Option<CartBuyerIdentityInput>,
}

/// User error from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartUserError {
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Field path that caused the error.
    #[serde(default)]
    pub field: Option<Vec<String>>,
    /// Human-readable error message.
    pub message: String,
}
