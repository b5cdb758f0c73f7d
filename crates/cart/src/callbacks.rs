//! Lifecycle hooks keyed by cart operation.
//!
//! Each operation carries an optional start hook, fired when the controller
//! accepts the action, and an optional complete hook, fired once after the
//! gateway call settles on both the success and failure paths.

use std::fmt;
use std::sync::Arc;

use crate::machine::CartOperation;

/// A lifecycle hook.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Start/complete hooks for one operation.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    /// Fired when the action is accepted.
    pub on_start: Option<Hook>,
    /// Fired after the gateway call settles.
    pub on_complete: Option<Hook>,
}

impl LifecycleHooks {
    fn slot_count(&self) -> usize {
        usize::from(self.on_start.is_some()) + usize::from(self.on_complete.is_some())
    }
}

/// Hooks for every cart operation.
#[derive(Clone, Default)]
pub struct CartCallbacks {
    pub create: LifecycleHooks,
    pub line_add: LifecycleHooks,
    pub line_update: LifecycleHooks,
    pub line_remove: LifecycleHooks,
    pub note_update: LifecycleHooks,
    pub buyer_identity_update: LifecycleHooks,
    pub attributes_update: LifecycleHooks,
    pub discount_codes_update: LifecycleHooks,
}

impl CartCallbacks {
    /// Hooks registered for an operation.
    #[must_use]
    pub const fn hooks(&self, operation: CartOperation) -> &LifecycleHooks {
        match operation {
            CartOperation::Create => &self.create,
            CartOperation::LineAdd => &self.line_add,
            CartOperation::LineUpdate => &self.line_update,
            CartOperation::LineRemove => &self.line_remove,
            CartOperation::NoteUpdate => &self.note_update,
            CartOperation::BuyerIdentityUpdate => &self.buyer_identity_update,
            CartOperation::AttributesUpdate => &self.attributes_update,
            CartOperation::DiscountCodesUpdate => &self.discount_codes_update,
        }
    }

    /// Mutable access to the hooks of an operation.
    pub const fn hooks_mut(&mut self, operation: CartOperation) -> &mut LifecycleHooks {
        match operation {
            CartOperation::Create => &mut self.create,
            CartOperation::LineAdd => &mut self.line_add,
            CartOperation::LineUpdate => &mut self.line_update,
            CartOperation::LineRemove => &mut self.line_remove,
            CartOperation::NoteUpdate => &mut self.note_update,
            CartOperation::BuyerIdentityUpdate => &mut self.buyer_identity_update,
            CartOperation::AttributesUpdate => &mut self.attributes_update,
            CartOperation::DiscountCodesUpdate => &mut self.discount_codes_update,
        }
    }

    /// Fire the start hook of `operation`, if any.
    pub fn started(&self, operation: CartOperation) {
        if let Some(hook) = &self.hooks(operation).on_start {
            hook();
        }
    }

    /// Fire the complete hook of `operation`, if any.
    pub fn completed(&self, operation: CartOperation) {
        if let Some(hook) = &self.hooks(operation).on_complete {
            hook();
        }
    }
}

impl fmt::Debug for CartCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered = CartOperation::ALL
            .iter()
            .map(|op| self.hooks(*op).slot_count())
            .sum::<usize>();
        f.debug_struct("CartCallbacks")
            .field("registered", &registered)
            .finish_non_exhaustive()
    }
}
