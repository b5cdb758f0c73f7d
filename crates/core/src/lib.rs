//! Pineapple Cart Core - Shared cart types.
//!
//! This crate provides the types shared by the cart components:
//! - `cart` - The cart state machine, gateway and identity store
//! - `cli` - Command-line driver for a live store
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for cart IDs, money, country codes, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
