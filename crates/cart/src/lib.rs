//! Pineapple Cart - client-side Shopify cart state.
//!
//! Owns the in-memory cart, mediates every mutation through the Storefront
//! API and exposes an observable [`CartControllerState`].
//!
//! # Modules
//!
//! - [`conversions`] - Server cart to snapshot normalization
//! - [`gateway`] - Remote cart operations and their Storefront implementation
//! - [`storage`] - Persisted cart ID
//! - [`reconcile`] - Buyer identity merging and post-create fix-up
//! - [`machine`] - The reducer and its actions
//! - [`controller`] - The async controller running the reducer
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pineapple_cart::{CartController, CartOptions, FileCartIdStore, StorefrontConfig};
//!
//! let config = StorefrontConfig::from_env()?;
//! let store = Arc::new(FileCartIdStore::new(&config.cart_id_store_path));
//! let cart = CartController::storefront(&config.shopify, store, CartOptions::from_config(&config))?;
//! cart.initialize().await;
//! cart.lines_add(vec![CartLineInput::new("gid://shopify/ProductVariant/1")]).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod callbacks;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod gateway;
pub mod machine;
pub mod options;
pub mod raw;
pub mod reconcile;
pub mod storage;
pub mod types;

pub use callbacks::{CartCallbacks, Hook, LifecycleHooks};
pub use config::{ConfigError, ShopifyStorefrontConfig, StorefrontConfig};
pub use controller::CartController;
pub use conversions::normalize;
pub use gateway::{CartGateway, GatewayError, GatewayResult, StorefrontGateway};
pub use machine::{CartControllerState, CartOperation, DispatchError};
pub use options::CartOptions;
pub use raw::RawCart;
pub use storage::{CART_ID_STORAGE_KEY, CartIdStore, FileCartIdStore, MemoryCartIdStore, StoreError};
pub use types::*;
