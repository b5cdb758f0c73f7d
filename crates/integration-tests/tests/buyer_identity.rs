//! Integration tests for buyer identity handling.
//!
//! Configured country and customer are merged into new carts, and a cart
//! that comes back without them gets exactly one follow-up update.

#![allow(clippy::unwrap_used)]

use pineapple_cart::{
    CartBuyerIdentityInput, CartInput, CartLineInput, CartOptions, GatewayError, normalize,
};
use pineapple_cart_core::{CartId, CartStatus, CountryCode};
use pineapple_cart_integration_tests::{
    CART_ID, FakeGateway, GatewayCall, GatewayOp, Harness, HookLog, RecordingStore, cart_with,
};
use serde_json::json;

fn country(code: &str) -> CountryCode {
    CountryCode::parse(code).unwrap()
}

fn create_input(harness: &Harness) -> CartInput {
    let calls = harness.gateway.calls_to(GatewayOp::Create);
    let [GatewayCall::Create(input)] = calls.as_slice() else {
        panic!("expected a single create call, got {calls:?}");
    };
    input.clone()
}

fn fix_ups(harness: &Harness) -> Vec<CartBuyerIdentityInput> {
    harness
        .gateway
        .calls_to(GatewayOp::BuyerIdentityUpdate)
        .into_iter()
        .filter_map(|call| match call {
            GatewayCall::BuyerIdentityUpdate(_, identity) => Some(identity),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Creation Input
// =============================================================================

#[tokio::test]
async fn test_configured_country_fills_create_input() {
    let harness = Harness::new(
        FakeGateway::new(),
        RecordingStore::new(),
        CartOptions::default().with_country_code(country("CA")),
    );

    harness
        .controller
        .lines_add(vec![CartLineInput::new("123")])
        .await
        .unwrap();

    assert_eq!(
        create_input(&harness).buyer_identity,
        Some(CartBuyerIdentityInput::country(country("CA")))
    );
}

#[tokio::test]
async fn test_explicit_buyer_identity_wins_field_wise() {
    let harness = Harness::new(
        FakeGateway::new(),
        RecordingStore::new(),
        CartOptions::default()
            .with_country_code(country("CA"))
            .with_customer_access_token("configured-token"),
    );

    harness
        .controller
        .cart_create(CartInput {
            buyer_identity: Some(CartBuyerIdentityInput {
                email: Some("buyer@example.com".to_string()),
                country_code: Some(country("GB")),
                ..CartBuyerIdentityInput::default()
            }),
            ..CartInput::default()
        })
        .await
        .unwrap();

    assert_eq!(
        create_input(&harness).buyer_identity,
        Some(CartBuyerIdentityInput {
            email: Some("buyer@example.com".to_string()),
            phone: None,
            country_code: Some(country("GB")),
            customer_access_token: Some("configured-token".to_string()),
        })
    );
}

#[tokio::test]
async fn test_no_configuration_creates_cart_in_us() {
    let harness = Harness::empty();

    harness
        .controller
        .cart_create(CartInput::default())
        .await
        .unwrap();

    assert_eq!(
        create_input(&harness).buyer_identity,
        Some(CartBuyerIdentityInput::country(country("US")))
    );
    // The created cart is already in US
    assert!(fix_ups(&harness).is_empty());
}

#[tokio::test]
async fn test_customer_token_alone_creates_cart_in_us() {
    let gateway = FakeGateway::new();
    gateway.respond(
        GatewayOp::Create,
        Ok(Some(cart_with(json!({
            "buyerIdentity": {"countryCode": "US", "customer": {"email": "test@test.com"}}
        })))),
    );
    let harness = Harness::new(
        gateway,
        RecordingStore::new(),
        CartOptions::default().with_customer_access_token("access token test"),
    );

    harness
        .controller
        .cart_create(CartInput::default())
        .await
        .unwrap();

    assert_eq!(
        create_input(&harness).buyer_identity,
        Some(CartBuyerIdentityInput {
            country_code: Some(country("US")),
            customer_access_token: Some("access token test".to_string()),
            ..CartBuyerIdentityInput::default()
        })
    );
    assert!(fix_ups(&harness).is_empty());
}

// =============================================================================
// Post-Create Fix-Up
// =============================================================================

#[tokio::test]
async fn test_country_mismatch_triggers_one_fix_up() {
    // The created cart comes back in US; the fix-up answer is in CA
    let gateway = FakeGateway::new();
    let fixed = cart_with(json!({"buyerIdentity": {"countryCode": "CA"}}));
    gateway.respond(GatewayOp::BuyerIdentityUpdate, Ok(Some(fixed.clone())));
    let harness = Harness::new(
        gateway,
        RecordingStore::new(),
        CartOptions::default().with_country_code(country("CA")),
    );

    harness
        .controller
        .lines_add(vec![CartLineInput::new("123")])
        .await
        .unwrap();

    assert_eq!(
        harness.gateway.calls_to(GatewayOp::BuyerIdentityUpdate),
        vec![GatewayCall::BuyerIdentityUpdate(
            CartId::new(CART_ID),
            CartBuyerIdentityInput::country(country("CA")),
        )]
    );
    let state = harness.state();
    assert_eq!(state.status, CartStatus::Idle);
    assert_eq!(state.snapshot, normalize(Some(fixed)));
}

#[tokio::test]
async fn test_matching_country_skips_fix_up() {
    let harness = Harness::new(
        FakeGateway::new(),
        RecordingStore::new(),
        CartOptions::default().with_country_code(country("US")),
    );

    harness
        .controller
        .cart_create(CartInput::default())
        .await
        .unwrap();

    assert!(fix_ups(&harness).is_empty());
}

#[tokio::test]
async fn test_missing_customer_triggers_fix_up_with_token() {
    let harness = Harness::new(
        FakeGateway::new(),
        RecordingStore::new(),
        CartOptions::default().with_customer_access_token("customer-token"),
    );

    harness
        .controller
        .cart_create(CartInput::default())
        .await
        .unwrap();

    assert_eq!(
        fix_ups(&harness),
        vec![CartBuyerIdentityInput {
            country_code: Some(country("US")),
            customer_access_token: Some("customer-token".to_string()),
            ..CartBuyerIdentityInput::default()
        }]
    );
}

#[tokio::test]
async fn test_cart_with_customer_skips_fix_up() {
    let gateway = FakeGateway::new();
    gateway.respond(
        GatewayOp::Create,
        Ok(Some(cart_with(json!({
            "buyerIdentity": {
                "countryCode": "US",
                "customer": {"id": "gid://shopify/Customer/1", "email": "buyer@example.com"}
            }
        })))),
    );
    let harness = Harness::new(
        gateway,
        RecordingStore::new(),
        CartOptions::default()
            .with_country_code(country("US"))
            .with_customer_access_token("customer-token"),
    );

    harness
        .controller
        .cart_create(CartInput::default())
        .await
        .unwrap();

    assert!(fix_ups(&harness).is_empty());
}

#[tokio::test]
async fn test_failed_fix_up_is_recorded_and_not_retried() {
    let error = GatewayError::message("Buyer identity cannot be changed");
    let gateway = FakeGateway::new();
    gateway.respond(GatewayOp::BuyerIdentityUpdate, Err(error.clone()));
    let harness = Harness::new(
        gateway,
        RecordingStore::new(),
        CartOptions::default().with_country_code(country("CA")),
    );

    harness
        .controller
        .lines_add(vec![CartLineInput::new("123")])
        .await
        .unwrap();

    let state = harness.state();
    assert_eq!(state.status, CartStatus::Idle);
    assert_eq!(state.error, Some(error));
    // The created cart stands
    assert_eq!(state.cart_id(), Some(&CartId::new(CART_ID)));
    assert_eq!(fix_ups(&harness).len(), 1);

    // Later updates do not retry the fix-up
    harness.controller.note_update("hello").await.unwrap();
    assert_eq!(fix_ups(&harness).len(), 1);
}

#[tokio::test]
async fn test_failed_create_skips_fix_up() {
    let gateway = FakeGateway::new();
    gateway.respond(
        GatewayOp::Create,
        Err(GatewayError::message("Error creating cart")),
    );
    let harness = Harness::new(
        gateway,
        RecordingStore::new(),
        CartOptions::default().with_country_code(country("CA")),
    );

    harness
        .controller
        .cart_create(CartInput::default())
        .await
        .unwrap();

    assert!(fix_ups(&harness).is_empty());
    assert_eq!(harness.state().status, CartStatus::Uninitialized);
}

#[tokio::test]
async fn test_fix_up_fires_no_buyer_identity_hooks() {
    let log = HookLog::default();
    let harness = Harness::new(
        FakeGateway::new(),
        RecordingStore::new(),
        log.attach(CartOptions::default().with_country_code(country("CA"))),
    );

    harness
        .controller
        .cart_create(CartInput::default())
        .await
        .unwrap();

    assert_eq!(fix_ups(&harness).len(), 1);
    assert_eq!(log.events(), vec!["create:start", "create:complete"]);
}
