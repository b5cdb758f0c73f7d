//! The cart controller: runs the state machine against a gateway and store.
//!
//! Every action method issues at most one gateway call (plus, after a
//! successful creation, at most one buyer identity fix-up) and returns once
//! the call has settled. Gateway failures never surface as `Err`; read
//! [`CartControllerState::error`] instead.

use std::sync::Arc;

use pineapple_cart_core::{CartLineId, CartStatus};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::callbacks::CartCallbacks;
use crate::config::{ConfigError, ShopifyStorefrontConfig};
use crate::conversions::normalize;
use crate::gateway::{CartGateway, StorefrontGateway};
use crate::machine::{
    CartAction, CartCommand, CartControllerState, CartMachine, CartOperation, CartRequest,
    DispatchError, SettleOutcome, StorageEffect, Transition,
};
use crate::options::CartOptions;
use crate::storage::CartIdStore;
use crate::types::{
    AttributeInput, CartBuyerIdentityInput, CartInput, CartLineInput, CartLineUpdateInput,
};

/// Owns the cart state and mediates every mutation.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct CartController {
    inner: Arc<CartControllerInner>,
}

struct CartControllerInner {
    machine: CartMachine,
    gateway: Arc<dyn CartGateway>,
    store: Arc<dyn CartIdStore>,
    callbacks: CartCallbacks,
    state: watch::Sender<CartControllerState>,
}

/// Whether the caller's lifecycle hooks fire for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookMode {
    Notify,
    Silent,
}

/// A request that has run to completion.
#[derive(Debug, Clone, Copy)]
struct Completed {
    operation: Option<CartOperation>,
    outcome: Option<SettleOutcome>,
}

impl CartController {
    /// Create a controller.
    ///
    /// With `options.data` the controller starts idle on that cart and the
    /// store is not consulted. Otherwise a stored cart ID puts it in
    /// `initializing` and, when called inside a Tokio runtime, the fetch of
    /// that cart is started right away. Without a runtime the fetch starts
    /// with the first [`CartController::initialize`] or action.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn CartGateway>,
        store: Arc<dyn CartIdStore>,
        options: CartOptions,
    ) -> Self {
        let machine = CartMachine::new(options.buyer_identity_target());

        let initial = match options.data {
            Some(data) => CartControllerState::seeded(normalize(Some(data))),
            None => match store.read() {
                Ok(Some(cart_id)) => CartControllerState::persisted(cart_id),
                Ok(None) => CartControllerState::default(),
                Err(e) => {
                    warn!(error = %e, "Failed to read persisted cart ID");
                    CartControllerState::default()
                }
            },
        };
        debug!(status = %initial.status, "Cart controller created");

        let awaiting_fetch = initial.status == CartStatus::Initializing;
        let (state, _) = watch::channel(initial);

        let controller = Self {
            inner: Arc::new(CartControllerInner {
                machine,
                gateway,
                store,
                callbacks: options.callbacks,
                state,
            }),
        };

        if awaiting_fetch && let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let startup = controller.clone();
            runtime.spawn(async move { startup.start_fetch().await });
        }

        controller
    }

    /// Create a controller talking to the Storefront API.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the store domain does not form a valid endpoint.
    pub fn storefront(
        config: &ShopifyStorefrontConfig,
        store: Arc<dyn CartIdStore>,
        options: CartOptions,
    ) -> Result<Self, ConfigError> {
        let mut gateway = StorefrontGateway::new(config)?;
        if let Some(fragment) = &options.cart_fragment {
            gateway = gateway.with_cart_fragment(fragment.clone());
        }
        Ok(Self::new(Arc::new(gateway), store, options))
    }

    /// A copy of the current state.
    #[must_use]
    pub fn state(&self) -> CartControllerState {
        self.inner.state.borrow().clone()
    }

    /// The current status.
    #[must_use]
    pub fn status(&self) -> CartStatus {
        self.inner.state.borrow().status
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartControllerState> {
        self.inner.state.subscribe()
    }

    /// Wait until the persisted cart, if any, has been fetched.
    ///
    /// Starts the fetch if it is not running yet. Returns immediately when
    /// the controller was created without a stored cart ID.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        self.start_fetch().await;

        let mut receiver = self.inner.state.subscribe();
        let settled = receiver
            .wait_for(|state| {
                !matches!(state.status, CartStatus::Initializing | CartStatus::Fetching)
            })
            .await;
        if let Err(e) = settled {
            warn!(error = %e, "Cart state closed before the initial fetch settled");
        }
    }

    /// Issue the fetch of the persisted cart. No-op unless `initializing`.
    async fn start_fetch(&self) {
        if let Err(e) = self.run(CartAction::StartFetch, HookMode::Notify).await {
            warn!(error = %e, "Initial cart fetch rejected");
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Create a new cart.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Busy` if another action is in flight.
    #[instrument(skip(self, input))]
    pub async fn cart_create(&self, input: CartInput) -> Result<(), DispatchError> {
        self.perform(CartCommand::Create(input)).await
    }

    /// Add lines, creating the cart if there is none.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Busy` if another action is in flight.
    #[instrument(skip(self, lines), fields(count = lines.len()))]
    pub async fn lines_add(&self, lines: Vec<CartLineInput>) -> Result<(), DispatchError> {
        self.perform(CartCommand::LinesAdd(lines)).await
    }

    /// Update lines.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Busy` if another action is in flight.
    #[instrument(skip(self, lines), fields(count = lines.len()))]
    pub async fn lines_update(&self, lines: Vec<CartLineUpdateInput>) -> Result<(), DispatchError> {
        self.perform(CartCommand::LinesUpdate(lines)).await
    }

    /// Remove lines.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Busy` if another action is in flight.
    #[instrument(skip(self, line_ids), fields(count = line_ids.len()))]
    pub async fn lines_remove(&self, line_ids: Vec<CartLineId>) -> Result<(), DispatchError> {
        self.perform(CartCommand::LinesRemove(line_ids)).await
    }

    /// Replace the note.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Busy` if another action is in flight.
    #[instrument(skip(self, note))]
    pub async fn note_update(&self, note: impl Into<String>) -> Result<(), DispatchError> {
        self.perform(CartCommand::NoteUpdate(note.into())).await
    }

    /// Update the buyer identity.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Busy` if another action is in flight.
    #[instrument(skip(self, buyer_identity))]
    pub async fn buyer_identity_update(
        &self,
        buyer_identity: CartBuyerIdentityInput,
    ) -> Result<(), DispatchError> {
        self.perform(CartCommand::BuyerIdentityUpdate(buyer_identity))
            .await
    }

    /// Replace the attributes.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Busy` if another action is in flight.
    #[instrument(skip(self, attributes))]
    pub async fn cart_attributes_update(
        &self,
        attributes: Vec<AttributeInput>,
    ) -> Result<(), DispatchError> {
        self.perform(CartCommand::AttributesUpdate(attributes)).await
    }

    /// Replace the discount codes.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Busy` if another action is in flight.
    #[instrument(skip(self, discount_codes))]
    pub async fn discount_codes_update(
        &self,
        discount_codes: Vec<String>,
    ) -> Result<(), DispatchError> {
        self.perform(CartCommand::DiscountCodesUpdate(discount_codes))
            .await
    }

    // =========================================================================
    // Effect runner
    // =========================================================================

    async fn perform(&self, command: CartCommand) -> Result<(), DispatchError> {
        // Actions apply to the persisted cart, not to whatever the store
        // held before it was fetched.
        self.initialize().await;

        let completed = self
            .run(CartAction::Dispatch(command), HookMode::Notify)
            .await?;

        if let Some(Completed {
            operation: Some(CartOperation::Create),
            outcome: Some(SettleOutcome::Confirmed),
        }) = completed
        {
            self.reconcile_buyer_identity().await;
        }

        Ok(())
    }

    /// Send at most one buyer identity update aligning a new cart with the
    /// configured identity. Its outcome is recorded on the state like any
    /// other update; it is never retried.
    async fn reconcile_buyer_identity(&self) {
        let fix = {
            let state = self.inner.state.borrow();
            self.inner.machine.target().fix_for(&state.snapshot)
        };
        let Some(fix) = fix else {
            return;
        };

        debug!("Aligning buyer identity of new cart with configuration");
        if let Err(e) = self
            .run(
                CartAction::Dispatch(CartCommand::BuyerIdentityUpdate(fix)),
                HookMode::Silent,
            )
            .await
        {
            warn!(error = %e, "Buyer identity fix-up rejected");
        }
    }

    /// Reduce `action`; if it issues a request, send it and settle.
    async fn run(
        &self,
        action: CartAction,
        hooks: HookMode,
    ) -> Result<Option<Completed>, DispatchError> {
        let Transition::Issue {
            sequence,
            operation,
            request,
        } = self.reduce(action)?
        else {
            return Ok(None);
        };

        let hooked = operation.filter(|_| hooks == HookMode::Notify);
        if let Some(operation) = hooked {
            self.inner.callbacks.started(operation);
        }

        // The settle and its complete hook run on their own task so both
        // happen even if the caller stops polling.
        let controller = self.clone();
        let settle = tokio::spawn(async move {
            let outcome = controller.settle(sequence, request).await;
            if let Some(operation) = hooked {
                controller.inner.callbacks.completed(operation);
            }
            outcome
        });
        let outcome = match settle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                warn!(error = %e, "Cart request task cancelled");
                None
            }
        };

        Ok(Some(Completed { operation, outcome }))
    }

    async fn settle(&self, sequence: u64, request: CartRequest) -> Option<SettleOutcome> {
        let result = request.send(self.inner.gateway.as_ref()).await;

        match self.reduce(CartAction::Settle { sequence, result }) {
            Ok(Transition::Settled { storage, outcome }) => {
                self.apply_storage(storage);
                Some(outcome)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Cart response rejected");
                None
            }
        }
    }

    fn reduce(&self, action: CartAction) -> Result<Transition, DispatchError> {
        let mut transition = Ok(Transition::Unchanged);
        self.inner.state.send_if_modified(|state| {
            transition = self.inner.machine.reduce(state, action);
            matches!(
                transition,
                Ok(Transition::Issue { .. } | Transition::Settled { .. })
            )
        });
        transition
    }

    fn apply_storage(&self, effect: Option<StorageEffect>) {
        let result = match &effect {
            Some(StorageEffect::Write(cart_id)) => self.inner.store.write(cart_id),
            Some(StorageEffect::Clear) => self.inner.store.clear(),
            None => return,
        };

        if let Err(e) = result {
            warn!(error = %e, effect = ?effect, "Failed to update persisted cart ID");
        }
    }
}

impl std::fmt::Debug for CartController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartController")
            .field("status", &self.status())
            .field("machine", &self.inner.machine)
            .field("callbacks", &self.inner.callbacks)
            .finish_non_exhaustive()
    }
}
