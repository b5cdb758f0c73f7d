//! Cart state machine.
//!
//! # Architecture
//!
//! - [`CartMachine::reduce`] is a pure reducer: it takes a [`CartAction`],
//!   updates [`CartControllerState`] and returns a [`Transition`] telling the
//!   caller which gateway request to send.
//! - The controller is the effect runner: it sends the request and feeds the
//!   result back as [`CartAction::Settle`].
//! - Only one request is in flight at a time. Commands arriving meanwhile
//!   are rejected with [`DispatchError::Busy`]; settles carrying an old
//!   sequence number are discarded.
//!
//! # Status flow
//!
//! ```text
//! uninitialized ──command──> creating ──ok──> idle
//!       ^                        └──err──┘ (idle if a cart was confirmed before)
//! initializing ──> fetching ──ok/null──> idle
//!                       └──err──> uninitialized
//! idle ──command──> updating ──ok/null/err──> idle
//! ```

mod action;
mod optimistic;
mod reducer;
mod state;

pub use action::{
    CartAction, CartCommand, CartOperation, CartRequest, DispatchError, SettleOutcome,
    StorageEffect, Transition,
};
pub use reducer::CartMachine;
pub use state::CartControllerState;
