use pineapple_cart_core::CartStatus;
use tracing::{debug, warn};

use super::action::{
    CartAction, CartCommand, CartOperation, CartRequest, DispatchError, SettleOutcome,
    StorageEffect, Transition,
};
use super::optimistic;
use super::state::CartControllerState;
use crate::conversions::normalize;
use crate::gateway::GatewayResult;
use crate::reconcile::BuyerIdentityTarget;
use crate::types::CartSnapshot;

/// The cart state machine.
///
/// `reduce` is synchronous and performs no I/O: it updates the state and
/// reports which gateway call, if any, the caller must issue next.
#[derive(Debug, Clone, Default)]
pub struct CartMachine {
    target: BuyerIdentityTarget,
}

impl CartMachine {
    /// Machine creating carts with the given buyer identity.
    #[must_use]
    pub const fn new(target: BuyerIdentityTarget) -> Self {
        Self { target }
    }

    /// The configured buyer identity.
    #[must_use]
    pub const fn target(&self) -> &BuyerIdentityTarget {
        &self.target
    }

    /// Apply an action to `state`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Busy` when a command arrives while a request
    /// is in flight. The state is left untouched.
    pub fn reduce(
        &self,
        state: &mut CartControllerState,
        action: CartAction,
    ) -> Result<Transition, DispatchError> {
        match action {
            CartAction::StartFetch => Ok(Self::start_fetch(state)),
            CartAction::Dispatch(command) => self.dispatch(state, command),
            CartAction::Settle { sequence, result } => Ok(Self::settle(state, sequence, result)),
        }
    }

    fn start_fetch(state: &mut CartControllerState) -> Transition {
        if state.status != CartStatus::Initializing {
            return Transition::Unchanged;
        }

        let Some(cart_id) = state.persisted_id.clone() else {
            state.status = CartStatus::Uninitialized;
            return Transition::Unchanged;
        };

        state.status = CartStatus::Fetching;
        state.sequence += 1;
        debug!(cart_id = %cart_id, sequence = state.sequence, "Fetching persisted cart");

        Transition::Issue {
            sequence: state.sequence,
            operation: None,
            request: CartRequest::Fetch(cart_id),
        }
    }

    fn dispatch(
        &self,
        state: &mut CartControllerState,
        command: CartCommand,
    ) -> Result<Transition, DispatchError> {
        if !state.status.accepts_actions() {
            warn!(
                status = %state.status,
                operation = %command.operation(),
                "Rejecting cart action while another is in flight"
            );
            return Err(DispatchError::Busy(state.status));
        }

        let (operation, request) = match state.cart_id().cloned() {
            Some(cart_id) if command.operation() != CartOperation::Create => {
                state.status = CartStatus::Updating;
                Self::apply_optimistic(&mut state.snapshot, &command);
                (command.operation(), command.into_request(cart_id))
            }
            _ => {
                state.status = CartStatus::Creating;
                let mut input = command.into_create_input();
                input.buyer_identity = self.target.merge(input.buyer_identity.take());
                (CartOperation::Create, CartRequest::Create(input))
            }
        };

        state.sequence += 1;
        state.last_action = Some(operation);
        debug!(
            operation = %operation,
            status = %state.status,
            sequence = state.sequence,
            "Cart action accepted"
        );

        Ok(Transition::Issue {
            sequence: state.sequence,
            operation: Some(operation),
            request,
        })
    }

    fn apply_optimistic(snapshot: &mut CartSnapshot, command: &CartCommand) {
        match command {
            CartCommand::LinesAdd(inputs) => optimistic::add_lines(&mut snapshot.lines, inputs),
            CartCommand::LinesUpdate(updates) => {
                optimistic::update_lines(&mut snapshot.lines, updates);
            }
            CartCommand::LinesRemove(line_ids) => {
                optimistic::remove_lines(&mut snapshot.lines, line_ids);
            }
            _ => {}
        }
    }

    fn settle(state: &mut CartControllerState, sequence: u64, result: GatewayResult) -> Transition {
        if sequence != state.sequence || !state.status.is_busy() {
            warn!(
                sequence,
                current = state.sequence,
                status = %state.status,
                "Discarding stale cart response"
            );
            return Transition::Stale;
        }

        match result {
            Ok(Some(raw)) => {
                let snapshot = normalize(Some(raw));
                let storage = snapshot
                    .id
                    .as_ref()
                    .filter(|id| state.persisted_id.as_ref() != Some(*id))
                    .cloned()
                    .map(|id| {
                        state.persisted_id = Some(id.clone());
                        StorageEffect::Write(id)
                    });

                state.last_valid_snapshot = snapshot.clone();
                state.snapshot = snapshot;
                state.status = CartStatus::Idle;
                state.error = None;
                debug!(sequence, "Cart confirmed by server");

                Transition::Settled {
                    storage,
                    outcome: SettleOutcome::Confirmed,
                }
            }
            Ok(None) => {
                state.snapshot = CartSnapshot::default();
                state.last_valid_snapshot = CartSnapshot::default();
                state.persisted_id = None;
                state.status = CartStatus::Idle;
                state.error = None;
                debug!(sequence, "Server reported no cart; clearing persisted ID");

                Transition::Settled {
                    storage: Some(StorageEffect::Clear),
                    outcome: SettleOutcome::Cleared,
                }
            }
            Err(error) => {
                state.snapshot = state.last_valid_snapshot.clone();
                state.status = if state.cart_id().is_some() {
                    CartStatus::Idle
                } else {
                    CartStatus::Uninitialized
                };
                debug!(sequence, error = %error, status = %state.status, "Cart request failed");
                state.error = Some(error);

                Transition::Settled {
                    storage: None,
                    outcome: SettleOutcome::Failed,
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::raw::{Connection, RawCart};
    use crate::types::{
        CartBuyerIdentityInput, CartInput, CartLine, CartLineInput, CartLineUpdateInput,
        CartMerchandise,
    };
    use pineapple_cart_core::{CartId, CartLineId, CountryCode, MerchandiseId};
    use secrecy::SecretString;

    fn raw_cart(id: &str, line_ids: &[&str]) -> RawCart {
        RawCart {
            lines: Some(Connection::from_nodes(line_ids.iter().map(|line_id| CartLine {
                id: Some(CartLineId::new(*line_id)),
                quantity: 1,
                attributes: Vec::new(),
                cost: None,
                merchandise: CartMerchandise::provisional(MerchandiseId::new("v1")),
                discount_allocations: Vec::new(),
            }))),
            ..RawCart::with_id(id)
        }
    }

    fn idle_with(id: &str, line_ids: &[&str]) -> CartControllerState {
        let mut state = CartControllerState::seeded(normalize(Some(raw_cart(id, line_ids))));
        state.persisted_id = Some(CartId::new(id));
        state
    }

    fn issue(
        machine: &CartMachine,
        state: &mut CartControllerState,
        command: CartCommand,
    ) -> (u64, Option<CartOperation>, CartRequest) {
        match machine.reduce(state, CartAction::Dispatch(command)).unwrap() {
            Transition::Issue {
                sequence,
                operation,
                request,
            } => (sequence, operation, request),
            other => panic!("expected Issue, got {other:?}"),
        }
    }

    fn settle(
        machine: &CartMachine,
        state: &mut CartControllerState,
        sequence: u64,
        result: GatewayResult,
    ) -> Transition {
        machine
            .reduce(state, CartAction::Settle { sequence, result })
            .unwrap()
    }

    #[test]
    fn test_start_fetch_from_persisted_id() {
        let machine = CartMachine::default();
        let mut state = CartControllerState::persisted(CartId::new("cart-id"));

        let transition = machine.reduce(&mut state, CartAction::StartFetch).unwrap();
        assert_eq!(
            transition,
            Transition::Issue {
                sequence: 1,
                operation: None,
                request: CartRequest::Fetch(CartId::new("cart-id")),
            }
        );
        assert_eq!(state.status, CartStatus::Fetching);

        settle(&machine, &mut state, 1, Ok(Some(raw_cart("cart-id", &["l1"]))));
        assert_eq!(state.status, CartStatus::Idle);
        assert_eq!(state.snapshot.lines.len(), 1);
    }

    #[test]
    fn test_start_fetch_ignored_when_not_initializing() {
        let machine = CartMachine::default();
        let mut state = idle_with("c1", &[]);
        let before = state.clone();
        assert_eq!(
            machine.reduce(&mut state, CartAction::StartFetch).unwrap(),
            Transition::Unchanged
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_fetch_null_cart_clears_storage() {
        let machine = CartMachine::default();
        let mut state = CartControllerState::persisted(CartId::new("cart-id"));
        machine.reduce(&mut state, CartAction::StartFetch).unwrap();

        let transition = settle(&machine, &mut state, 1, Ok(None));
        assert_eq!(
            transition,
            Transition::Settled {
                storage: Some(StorageEffect::Clear),
                outcome: SettleOutcome::Cleared,
            }
        );
        assert_eq!(state.status, CartStatus::Idle);
        assert!(state.snapshot.lines.is_empty());
        assert!(state.persisted_id.is_none());
    }

    #[test]
    fn test_fetch_failure_stays_uninitialized() {
        let machine = CartMachine::default();
        let mut state = CartControllerState::persisted(CartId::new("cart-id"));
        machine.reduce(&mut state, CartAction::StartFetch).unwrap();

        settle(&machine, &mut state, 1, Err(GatewayError::message("boom")));
        assert_eq!(state.status, CartStatus::Uninitialized);
        assert_eq!(state.error, Some(GatewayError::message("boom")));
    }

    #[test]
    fn test_implicit_create_folds_lines() {
        let machine = CartMachine::default();
        let mut state = CartControllerState::default();
        let lines = vec![CartLineInput::new("123")];

        let (sequence, operation, request) =
            issue(&machine, &mut state, CartCommand::LinesAdd(lines.clone()));
        assert_eq!(operation, Some(CartOperation::Create));
        assert_eq!(
            request,
            CartRequest::Create(CartInput {
                lines: Some(lines),
                ..CartInput::default()
            })
        );
        assert_eq!(state.status, CartStatus::Creating);
        assert_eq!(state.last_action, Some(CartOperation::Create));

        let transition = settle(&machine, &mut state, sequence, Ok(Some(raw_cart("c1", &["l1"]))));
        assert_eq!(
            transition,
            Transition::Settled {
                storage: Some(StorageEffect::Write(CartId::new("c1"))),
                outcome: SettleOutcome::Confirmed,
            }
        );
        assert_eq!(state.status, CartStatus::Idle);
        assert_eq!(state.persisted_id, Some(CartId::new("c1")));
    }

    #[test]
    fn test_failed_create_stays_uninitialized_and_retries() {
        let machine = CartMachine::default();
        let mut state = CartControllerState::default();

        let (sequence, ..) = issue(
            &machine,
            &mut state,
            CartCommand::Create(CartInput::default()),
        );
        settle(&machine, &mut state, sequence, Err(GatewayError::message("nope")));
        assert_eq!(state.status, CartStatus::Uninitialized);
        assert!(state.error.is_some());

        let (_, operation, _) = issue(
            &machine,
            &mut state,
            CartCommand::NoteUpdate("hello".to_string()),
        );
        assert_eq!(operation, Some(CartOperation::Create));
        assert_eq!(state.status, CartStatus::Creating);
    }

    #[test]
    fn test_create_from_idle_failure_restores_cart() {
        let machine = CartMachine::default();
        let mut state = idle_with("c1", &["l1"]);
        let before = state.snapshot.clone();

        let (sequence, operation, _) = issue(
            &machine,
            &mut state,
            CartCommand::Create(CartInput::default()),
        );
        assert_eq!(operation, Some(CartOperation::Create));
        assert_eq!(state.status, CartStatus::Creating);

        settle(&machine, &mut state, sequence, Err(GatewayError::message("nope")));
        assert_eq!(state.status, CartStatus::Idle);
        assert_eq!(state.snapshot, before);
    }

    #[test]
    fn test_update_applies_optimistic_then_server_result() {
        let machine = CartMachine::default();
        let mut state = idle_with("c1", &["l1", "l2"]);

        let (sequence, operation, request) = issue(
            &machine,
            &mut state,
            CartCommand::LinesRemove(vec![CartLineId::new("l1")]),
        );
        assert_eq!(operation, Some(CartOperation::LineRemove));
        assert_eq!(
            request,
            CartRequest::LinesRemove(CartId::new("c1"), vec![CartLineId::new("l1")])
        );
        assert_eq!(state.status, CartStatus::Updating);
        assert_eq!(state.snapshot.lines.len(), 1);
        assert_eq!(state.last_valid_snapshot.lines.len(), 2);

        let returned = raw_cart("c1", &["l2", "l3"]);
        let transition = settle(&machine, &mut state, sequence, Ok(Some(returned.clone())));
        assert_eq!(
            transition,
            Transition::Settled {
                storage: None,
                outcome: SettleOutcome::Confirmed,
            }
        );
        assert_eq!(state.snapshot, normalize(Some(returned)));
        assert_eq!(state.last_valid_snapshot, state.snapshot);
    }

    #[test]
    fn test_update_failure_reverts_to_last_valid() {
        let machine = CartMachine::default();
        let mut state = idle_with("c1", &["l1"]);
        let before = state.snapshot.clone();

        let (sequence, ..) = issue(
            &machine,
            &mut state,
            CartCommand::LinesUpdate(vec![CartLineUpdateInput::new("l1").with_quantity(5)]),
        );
        assert_eq!(state.snapshot.lines[0].quantity, 5);

        let error = GatewayError::message("Error updating lines");
        settle(&machine, &mut state, sequence, Err(error.clone()));
        assert_eq!(state.status, CartStatus::Idle);
        assert_eq!(state.snapshot, before);
        assert_eq!(state.error, Some(error));
    }

    #[test]
    fn test_busy_rejects_without_touching_state() {
        let machine = CartMachine::default();
        let mut state = idle_with("c1", &["l1"]);
        issue(
            &machine,
            &mut state,
            CartCommand::NoteUpdate("first".to_string()),
        );
        let before = state.clone();

        let err = machine
            .reduce(
                &mut state,
                CartAction::Dispatch(CartCommand::NoteUpdate("second".to_string())),
            )
            .unwrap_err();
        assert_eq!(err, DispatchError::Busy(CartStatus::Updating));
        assert_eq!(state, before);
    }

    #[test]
    fn test_stale_settle_is_discarded() {
        let machine = CartMachine::default();
        let mut state = idle_with("c1", &["l1"]);
        let (sequence, ..) = issue(
            &machine,
            &mut state,
            CartCommand::NoteUpdate("note".to_string()),
        );
        let before = state.clone();

        assert_eq!(
            settle(&machine, &mut state, sequence - 1, Ok(None)),
            Transition::Stale
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_settle_while_idle_is_stale() {
        let machine = CartMachine::default();
        let mut state = idle_with("c1", &[]);
        let sequence = state.sequence;
        assert_eq!(
            settle(&machine, &mut state, sequence, Ok(None)),
            Transition::Stale
        );
        assert!(state.snapshot.id.is_some());
    }

    #[test]
    fn test_null_cart_from_update_clears_storage() {
        let machine = CartMachine::default();
        let mut state = idle_with("c1", &["l1"]);
        let (sequence, ..) = issue(
            &machine,
            &mut state,
            CartCommand::DiscountCodesUpdate(vec!["SAVE10".to_string()]),
        );

        let transition = settle(&machine, &mut state, sequence, Ok(None));
        assert_eq!(
            transition,
            Transition::Settled {
                storage: Some(StorageEffect::Clear),
                outcome: SettleOutcome::Cleared,
            }
        );
        assert_eq!(state.status, CartStatus::Idle);
        assert!(state.snapshot.lines.is_empty());
        assert!(state.cart_id().is_none());
    }

    #[test]
    fn test_create_merges_configured_buyer_identity() {
        let machine = CartMachine::new(BuyerIdentityTarget {
            country_code: Some(CountryCode::parse("US").unwrap()),
            customer_access_token: Some(SecretString::from("token")),
        });
        let mut state = CartControllerState::default();

        let explicit = CartBuyerIdentityInput::country(CountryCode::parse("CA").unwrap());
        let (_, _, request) = issue(
            &machine,
            &mut state,
            CartCommand::Create(CartInput {
                buyer_identity: Some(explicit),
                ..CartInput::default()
            }),
        );

        let CartRequest::Create(input) = request else {
            panic!("expected a create request");
        };
        let identity = input.buyer_identity.unwrap();
        assert_eq!(identity.country_code, Some(CountryCode::parse("CA").unwrap()));
        assert_eq!(identity.customer_access_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_sequence_increases_per_accepted_action() {
        let machine = CartMachine::default();
        let mut state = idle_with("c1", &[]);

        let (first, ..) = issue(&machine, &mut state, CartCommand::NoteUpdate("a".to_string()));
        settle(&machine, &mut state, first, Ok(Some(raw_cart("c1", &[]))));
        let (second, ..) = issue(&machine, &mut state, CartCommand::NoteUpdate("b".to_string()));
        assert!(second > first);
    }
}
