use pineapple_cart_core::{CartId, CartStatus};

use super::CartOperation;
use crate::gateway::GatewayError;
use crate::types::CartSnapshot;

/// Everything the cart controller knows.
///
/// Mutated only by [`CartMachine::reduce`](super::CartMachine::reduce).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartControllerState {
    /// Where the machine is in its lifecycle.
    pub status: CartStatus,
    /// The cart as the UI should render it. May hold optimistic changes
    /// while an update is in flight.
    pub snapshot: CartSnapshot,
    /// The most recent server-confirmed cart, restored on failure.
    pub last_valid_snapshot: CartSnapshot,
    /// The error payload of the most recent failed call.
    pub error: Option<GatewayError>,
    /// The operation most recently accepted.
    pub last_action: Option<CartOperation>,
    /// Sequence number of the request currently in flight, or of the last
    /// one issued.
    pub sequence: u64,
    /// The cart ID last read from or written to storage.
    pub persisted_id: Option<CartId>,
}

impl CartControllerState {
    /// State seeded with caller-supplied cart data: idle, no fetch.
    #[must_use]
    pub fn seeded(snapshot: CartSnapshot) -> Self {
        Self {
            status: CartStatus::Idle,
            last_valid_snapshot: snapshot.clone(),
            snapshot,
            ..Self::default()
        }
    }

    /// State awaiting a fetch of the persisted cart.
    #[must_use]
    pub fn persisted(cart_id: CartId) -> Self {
        Self {
            status: CartStatus::Initializing,
            persisted_id: Some(cart_id),
            ..Self::default()
        }
    }

    /// The ID of the last server-confirmed cart.
    #[must_use]
    pub const fn cart_id(&self) -> Option<&CartId> {
        self.last_valid_snapshot.id.as_ref()
    }
}
