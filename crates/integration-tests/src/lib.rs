//! Integration tests for Pineapple Cart.
//!
//! Drives a real [`CartController`] against a scripted [`FakeGateway`] and a
//! [`RecordingStore`], so every scenario runs without network access.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pineapple-cart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `initialization` - Seed data, persisted IDs and the startup fetch
//! - `mutations` - Implicit creation, updates and failures
//! - `optimistic` - In-flight snapshots while a request is held open
//! - `buyer_identity` - Creation merging and the post-create fix-up
//! - `callbacks` - Lifecycle hook ordering

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use pineapple_cart::{
    AttributeInput, CartBuyerIdentityInput, CartController, CartControllerState, CartGateway,
    CartIdStore, CartInput, CartLineInput, CartLineUpdateInput, CartOperation, CartOptions,
    GatewayResult, MemoryCartIdStore, RawCart, StoreError,
};
use pineapple_cart_core::{CartId, CartLineId, CartStatus};
use serde_json::{Value, json};
use tokio::sync::Notify;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Fixtures
// =============================================================================

/// ID of the cart returned by [`cart_mock`].
pub const CART_ID: &str = "gid://shopify/Cart/c1";

/// ID of the line in [`cart_mock`].
pub const LINE_ID: &str = "gid://shopify/CartLine/l1";

/// A cart line as the Storefront API returns it.
#[must_use]
pub fn cart_line_mock() -> Value {
    json!({
        "id": LINE_ID,
        "quantity": 1,
        "attributes": [],
        "cost": {
            "amountPerQuantity": {"amount": "19.99", "currencyCode": "USD"},
            "totalAmount": {"amount": "19.99", "currencyCode": "USD"}
        },
        "merchandise": {
            "id": "gid://shopify/ProductVariant/v1",
            "title": "Default Title",
            "availableForSale": true,
            "requiresShipping": true,
            "price": {"amount": "19.99", "currencyCode": "USD"},
            "selectedOptions": [{"name": "Size", "value": "M"}],
            "product": {
                "id": "gid://shopify/Product/p1",
                "handle": "pineapple-shirt",
                "title": "Pineapple Shirt"
            }
        },
        "discountAllocations": []
    })
}

/// A cart with a single line, buyer country `US` and no customer.
#[must_use]
pub fn cart_mock() -> Value {
    json!({
        "id": CART_ID,
        "checkoutUrl": "https://test.myshopify.com/cart/c/c1",
        "note": "",
        "totalQuantity": 1,
        "attributes": [],
        "buyerIdentity": {"countryCode": "US", "customer": null},
        "cost": {
            "subtotalAmount": {"amount": "19.99", "currencyCode": "USD"},
            "totalAmount": {"amount": "19.99", "currencyCode": "USD"}
        },
        "discountCodes": [],
        "lines": {"edges": [{"node": cart_line_mock()}]}
    })
}

/// Parse a fixture into a [`RawCart`].
///
/// # Panics
///
/// Panics if `value` is not cart-shaped.
#[must_use]
pub fn raw_cart(value: Value) -> RawCart {
    serde_json::from_value(value).expect("fixture is a valid cart")
}

/// [`cart_mock`] with its fields overridden by `overrides`.
#[must_use]
pub fn cart_with(overrides: Value) -> RawCart {
    let mut cart = cart_mock();
    if let (Some(cart), Value::Object(overrides)) = (cart.as_object_mut(), overrides) {
        cart.extend(overrides);
    }
    raw_cart(cart)
}

// =============================================================================
// Fake Gateway
// =============================================================================

/// Gateway operation, used to script and inspect [`FakeGateway`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    Create,
    Fetch,
    LineAdd,
    LineUpdate,
    LineRemove,
    NoteUpdate,
    BuyerIdentityUpdate,
    AttributesUpdate,
    DiscountCodesUpdate,
}

/// A call received by [`FakeGateway`], with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Create(CartInput),
    Fetch(CartId),
    LineAdd(CartId, Vec<CartLineInput>),
    LineUpdate(CartId, Vec<CartLineUpdateInput>),
    LineRemove(CartId, Vec<CartLineId>),
    NoteUpdate(CartId, String),
    BuyerIdentityUpdate(CartId, CartBuyerIdentityInput),
    AttributesUpdate(CartId, Vec<AttributeInput>),
    DiscountCodesUpdate(CartId, Vec<String>),
}

impl GatewayCall {
    /// The operation this call targets.
    #[must_use]
    pub const fn op(&self) -> GatewayOp {
        match self {
            Self::Create(_) => GatewayOp::Create,
            Self::Fetch(_) => GatewayOp::Fetch,
            Self::LineAdd(..) => GatewayOp::LineAdd,
            Self::LineUpdate(..) => GatewayOp::LineUpdate,
            Self::LineRemove(..) => GatewayOp::LineRemove,
            Self::NoteUpdate(..) => GatewayOp::NoteUpdate,
            Self::BuyerIdentityUpdate(..) => GatewayOp::BuyerIdentityUpdate,
            Self::AttributesUpdate(..) => GatewayOp::AttributesUpdate,
            Self::DiscountCodesUpdate(..) => GatewayOp::DiscountCodesUpdate,
        }
    }
}

/// Releases a request held by [`FakeGateway::hold`].
#[derive(Debug, Clone)]
pub struct Hold(Arc<Notify>);

impl Hold {
    /// Let the held request answer.
    pub fn release(&self) {
        self.0.notify_one();
    }
}

#[derive(Default)]
struct Script {
    once: HashMap<GatewayOp, VecDeque<GatewayResult>>,
    always: HashMap<GatewayOp, GatewayResult>,
    holds: HashMap<GatewayOp, Arc<Notify>>,
}

/// Scripted in-memory gateway.
///
/// Unscripted operations answer with [`cart_mock`]. Every call is recorded
/// before it is answered.
#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<GatewayCall>>,
    script: Mutex<Script>,
}

impl FakeGateway {
    /// Gateway answering everything with [`cart_mock`].
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every call to `op` with `result`.
    pub fn respond(&self, op: GatewayOp, result: GatewayResult) {
        lock(&self.script).always.insert(op, result);
    }

    /// Answer the next call to `op` with `result`, ahead of [`Self::respond`].
    pub fn respond_once(&self, op: GatewayOp, result: GatewayResult) {
        lock(&self.script)
            .once
            .entry(op)
            .or_default()
            .push_back(result);
    }

    /// Keep the next call to `op` pending until the returned hold is released.
    #[must_use]
    pub fn hold(&self, op: GatewayOp) -> Hold {
        let notify = Arc::new(Notify::new());
        lock(&self.script).holds.insert(op, notify.clone());
        Hold(notify)
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.calls).clone()
    }

    /// Calls received for `op`.
    #[must_use]
    pub fn calls_to(&self, op: GatewayOp) -> Vec<GatewayCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.op() == op)
            .cloned()
            .collect()
    }

    async fn answer(&self, call: GatewayCall) -> GatewayResult {
        let op = call.op();
        lock(&self.calls).push(call);

        let hold = lock(&self.script).holds.remove(&op);
        if let Some(hold) = hold {
            hold.notified().await;
        }

        let mut script = lock(&self.script);
        if let Some(result) = script.once.get_mut(&op).and_then(VecDeque::pop_front) {
            return result;
        }
        script
            .always
            .get(&op)
            .cloned()
            .unwrap_or_else(|| Ok(Some(raw_cart(cart_mock()))))
    }
}

#[async_trait]
impl CartGateway for FakeGateway {
    async fn cart_create(&self, input: CartInput) -> GatewayResult {
        self.answer(GatewayCall::Create(input)).await
    }

    async fn cart_fetch(&self, cart_id: &CartId) -> GatewayResult {
        self.answer(GatewayCall::Fetch(cart_id.clone())).await
    }

    async fn cart_line_add(&self, cart_id: &CartId, lines: Vec<CartLineInput>) -> GatewayResult {
        self.answer(GatewayCall::LineAdd(cart_id.clone(), lines))
            .await
    }

    async fn cart_line_update(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> GatewayResult {
        self.answer(GatewayCall::LineUpdate(cart_id.clone(), lines))
            .await
    }

    async fn cart_line_remove(&self, cart_id: &CartId, line_ids: Vec<CartLineId>) -> GatewayResult {
        self.answer(GatewayCall::LineRemove(cart_id.clone(), line_ids))
            .await
    }

    async fn note_update(&self, cart_id: &CartId, note: String) -> GatewayResult {
        self.answer(GatewayCall::NoteUpdate(cart_id.clone(), note))
            .await
    }

    async fn buyer_identity_update(
        &self,
        cart_id: &CartId,
        buyer_identity: CartBuyerIdentityInput,
    ) -> GatewayResult {
        self.answer(GatewayCall::BuyerIdentityUpdate(
            cart_id.clone(),
            buyer_identity,
        ))
        .await
    }

    async fn cart_attributes_update(
        &self,
        cart_id: &CartId,
        attributes: Vec<AttributeInput>,
    ) -> GatewayResult {
        self.answer(GatewayCall::AttributesUpdate(cart_id.clone(), attributes))
            .await
    }

    async fn discount_codes_update(
        &self,
        cart_id: &CartId,
        discount_codes: Vec<String>,
    ) -> GatewayResult {
        self.answer(GatewayCall::DiscountCodesUpdate(
            cart_id.clone(),
            discount_codes,
        ))
        .await
    }
}

// =============================================================================
// Recording Store
// =============================================================================

/// An operation on [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Read,
    Write(CartId),
    Clear,
}

/// In-memory cart ID store that records every operation.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryCartIdStore,
    ops: Mutex<Vec<StoreOp>>,
}

impl RecordingStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store already holding `cart_id`.
    #[must_use]
    pub fn with_cart_id(cart_id: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCartIdStore::with_cart_id(cart_id),
            ops: Mutex::default(),
        })
    }

    /// Operations received so far.
    #[must_use]
    pub fn ops(&self) -> Vec<StoreOp> {
        lock(&self.ops).clone()
    }

    /// The stored cart ID, read without recording.
    #[must_use]
    pub fn current(&self) -> Option<CartId> {
        self.inner.read().ok().flatten()
    }
}

impl CartIdStore for RecordingStore {
    fn read(&self) -> Result<Option<CartId>, StoreError> {
        lock(&self.ops).push(StoreOp::Read);
        self.inner.read()
    }

    fn write(&self, cart_id: &CartId) -> Result<(), StoreError> {
        lock(&self.ops).push(StoreOp::Write(cart_id.clone()));
        self.inner.write(cart_id)
    }

    fn clear(&self) -> Result<(), StoreError> {
        lock(&self.ops).push(StoreOp::Clear);
        self.inner.clear()
    }
}

// =============================================================================
// Hook Log
// =============================================================================

/// Ordered log of lifecycle hook invocations, as `"{operation}:start"` and
/// `"{operation}:complete"`.
#[derive(Debug, Clone, Default)]
pub struct HookLog(Arc<Mutex<Vec<String>>>);

impl HookLog {
    /// Register start and complete hooks for every operation on `options`.
    #[must_use]
    pub fn attach(&self, mut options: CartOptions) -> CartOptions {
        for operation in CartOperation::ALL {
            let started = self.clone();
            let completed = self.clone();
            options = options
                .on_start(operation, move || started.push(format!("{operation}:start")))
                .on_complete(operation, move || {
                    completed.push(format!("{operation}:complete"));
                });
        }
        options
    }

    fn push(&self, event: String) {
        lock(&self.0).push(event);
    }

    /// Events logged so far.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        lock(&self.0).clone()
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A controller wired to a fake gateway and recording store.
pub struct Harness {
    pub controller: CartController,
    pub gateway: Arc<FakeGateway>,
    pub store: Arc<RecordingStore>,
}

impl Harness {
    /// Controller over `gateway` and `store`.
    #[must_use]
    pub fn new(gateway: Arc<FakeGateway>, store: Arc<RecordingStore>, options: CartOptions) -> Self {
        let controller = CartController::new(gateway.clone(), store.clone(), options);
        Self {
            controller,
            gateway,
            store,
        }
    }

    /// Controller with no seed data and no stored cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(FakeGateway::new(), RecordingStore::new(), CartOptions::default())
    }

    /// Controller seeded with [`cart_mock`].
    #[must_use]
    pub fn seeded(options: CartOptions) -> Self {
        Self::new(
            FakeGateway::new(),
            RecordingStore::new(),
            options.with_data(raw_cart(cart_mock())),
        )
    }

    /// The controller's current state.
    #[must_use]
    pub fn state(&self) -> CartControllerState {
        self.controller.state()
    }

    /// Wait until the controller reaches `status`.
    ///
    /// # Panics
    ///
    /// Panics if the controller is dropped first.
    pub async fn wait_for(&self, status: CartStatus) -> CartControllerState {
        let mut receiver = self.controller.subscribe();
        receiver
            .wait_for(|state| state.status == status)
            .await
            .expect("controller alive")
            .clone()
    }
}
