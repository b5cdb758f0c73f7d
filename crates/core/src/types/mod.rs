//! Core types for the cart.
//!
//! This module provides type-safe wrappers for common cart concepts.

pub mod country;
pub mod id;
pub mod money;
pub mod status;

pub use country::{CountryCode, CountryCodeError};
pub use id::*;
pub use money::Money;
pub use status::CartStatus;
