//! GraphQL documents for the Storefront API cart operations.
//!
//! Every document selects `...CartFragment`; the fragment text is appended at
//! request time so callers can widen or narrow what a cart carries.

/// Cart selection used when the caller does not provide one.
pub const DEFAULT_CART_FRAGMENT: &str = r"
fragment CartFragment on Cart {
  id
  checkoutUrl
  createdAt
  updatedAt
  totalQuantity
  note
  buyerIdentity {
    countryCode
    email
    phone
    customer {
      id
      email
      firstName
      lastName
    }
  }
  attributes {
    key
    value
  }
  cost {
    subtotalAmount { amount currencyCode }
    totalAmount { amount currencyCode }
    totalTaxAmount { amount currencyCode }
    totalDutyAmount { amount currencyCode }
  }
  discountCodes {
    code
    applicable
  }
  lines(first: $numCartLines) {
    edges {
      node {
        ... on CartLine {
          id
          quantity
          attributes { key value }
          cost {
            amountPerQuantity { amount currencyCode }
            compareAtAmountPerQuantity { amount currencyCode }
            subtotalAmount { amount currencyCode }
            totalAmount { amount currencyCode }
          }
          discountAllocations {
            discountedAmount { amount currencyCode }
          }
          merchandise {
            ... on ProductVariant {
              id
              title
              sku
              availableForSale
              requiresShipping
              price { amount currencyCode }
              compareAtPrice { amount currencyCode }
              selectedOptions { name value }
              image { id url altText width height }
              product { id handle title vendor }
            }
          }
        }
      }
    }
  }
}
";

/// Maximum number of lines requested per cart.
pub const NUM_CART_LINES: i64 = 250;

const USER_ERRORS: &str = "userErrors { code field message }";

/// One operation: its root field, operation name and the variable list it
/// declares besides the cart selection.
pub struct CartDocument {
    /// Root field of the response (`cart`, `cartCreate`, ...).
    pub root: &'static str,
    /// GraphQL operation name.
    pub operation_name: &'static str,
    kind: &'static str,
    variables: &'static str,
    arguments: &'static str,
}

pub const CART_QUERY: CartDocument = CartDocument {
    root: "cart",
    operation_name: "CartQuery",
    kind: "query",
    variables: "$id: ID!",
    arguments: "id: $id",
};

pub const CART_CREATE: CartDocument = CartDocument {
    root: "cartCreate",
    operation_name: "CartCreate",
    kind: "mutation",
    variables: "$input: CartInput!",
    arguments: "input: $input",
};

pub const CART_LINES_ADD: CartDocument = CartDocument {
    root: "cartLinesAdd",
    operation_name: "CartLinesAdd",
    kind: "mutation",
    variables: "$cartId: ID!, $lines: [CartLineInput!]!",
    arguments: "cartId: $cartId, lines: $lines",
};

pub const CART_LINES_UPDATE: CartDocument = CartDocument {
    root: "cartLinesUpdate",
    operation_name: "CartLinesUpdate",
    kind: "mutation",
    variables: "$cartId: ID!, $lines: [CartLineUpdateInput!]!",
    arguments: "cartId: $cartId, lines: $lines",
};

pub const CART_LINES_REMOVE: CartDocument = CartDocument {
    root: "cartLinesRemove",
    operation_name: "CartLinesRemove",
    kind: "mutation",
    variables: "$cartId: ID!, $lineIds: [ID!]!",
    arguments: "cartId: $cartId, lineIds: $lineIds",
};

pub const CART_NOTE_UPDATE: CartDocument = CartDocument {
    root: "cartNoteUpdate",
    operation_name: "CartNoteUpdate",
    kind: "mutation",
    variables: "$cartId: ID!, $note: String!",
    arguments: "cartId: $cartId, note: $note",
};

pub const CART_BUYER_IDENTITY_UPDATE: CartDocument = CartDocument {
    root: "cartBuyerIdentityUpdate",
    operation_name: "CartBuyerIdentityUpdate",
    kind: "mutation",
    variables: "$cartId: ID!, $buyerIdentity: CartBuyerIdentityInput!",
    arguments: "cartId: $cartId, buyerIdentity: $buyerIdentity",
};

pub const CART_ATTRIBUTES_UPDATE: CartDocument = CartDocument {
    root: "cartAttributesUpdate",
    operation_name: "CartAttributesUpdate",
    kind: "mutation",
    variables: "$cartId: ID!, $attributes: [AttributeInput!]!",
    arguments: "cartId: $cartId, attributes: $attributes",
};

pub const CART_DISCOUNT_CODES_UPDATE: CartDocument = CartDocument {
    root: "cartDiscountCodesUpdate",
    operation_name: "CartDiscountCodesUpdate",
    kind: "mutation",
    variables: "$cartId: ID!, $discountCodes: [String!]",
    arguments: "cartId: $cartId, discountCodes: $discountCodes",
};

impl CartDocument {
    /// Render the full document with the given cart fragment appended.
    #[must_use]
    pub fn render(&self, cart_fragment: &str) -> String {
        let selection = if self.kind == "query" {
            format!("{}({}) {{ ...CartFragment }}", self.root, self.arguments)
        } else {
            format!(
                "{}({}) {{ cart {{ ...CartFragment }} {USER_ERRORS} }}",
                self.root, self.arguments
            )
        };

        format!(
            "{} {}({}, $numCartLines: Int = {NUM_CART_LINES}) {{ {selection} }}\n{cart_fragment}",
            self.kind, self.operation_name, self.variables
        )
    }
}
