//! Tentative line edits applied before the server confirms them.
//!
//! The server's response always supersedes these; on failure the machine
//! restores the last confirmed snapshot instead.

use pineapple_cart_core::CartLineId;

use crate::types::{Attribute, CartLine, CartLineInput, CartLineUpdateInput, CartMerchandise};

/// Append provisional lines, one per input. Quantity defaults to 1.
pub fn add_lines(lines: &mut Vec<CartLine>, inputs: &[CartLineInput]) {
    lines.extend(inputs.iter().map(|input| CartLine {
        id: None,
        quantity: input.quantity.unwrap_or(1),
        attributes: input
            .attributes
            .iter()
            .flatten()
            .cloned()
            .map(Attribute::from)
            .collect(),
        cost: None,
        merchandise: CartMerchandise::provisional(input.merchandise_id.clone()),
        discount_allocations: Vec::new(),
    }));
}

/// Merge each update onto the line with the same ID, in place.
///
/// Updates naming unknown lines are ignored.
pub fn update_lines(lines: &mut [CartLine], updates: &[CartLineUpdateInput]) {
    for update in updates {
        let Some(line) = lines
            .iter_mut()
            .find(|line| line.id.as_ref() == Some(&update.id))
        else {
            continue;
        };

        if let Some(quantity) = update.quantity {
            line.quantity = quantity;
        }
        if let Some(merchandise_id) = &update.merchandise_id
            && *merchandise_id != line.merchandise.id
        {
            line.merchandise = CartMerchandise::provisional(merchandise_id.clone());
            line.cost = None;
        }
        if let Some(attributes) = &update.attributes {
            line.attributes = attributes.iter().cloned().map(Attribute::from).collect();
        }
    }
}

/// Drop the named lines.
pub fn remove_lines(lines: &mut Vec<CartLine>, line_ids: &[CartLineId]) {
    lines.retain(|line| {
        line.id
            .as_ref()
            .is_none_or(|id| !line_ids.contains(id))
    });
}
