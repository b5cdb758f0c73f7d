//! Persisted cart identity.
//!
//! A single string slot, keyed by [`CART_ID_STORAGE_KEY`], remembering the
//! active cart between sessions. The controller reads it once at
//! construction, writes it whenever a settle yields a new cart ID and clears
//! it when the server reports the cart gone.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use pineapple_cart_core::CartId;
use thiserror::Error;

/// Key the cart ID is stored under.
pub const CART_ID_STORAGE_KEY: &str = "shopifyCartId";

/// Errors from the backing storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read/write/clear access to the persisted cart ID.
///
/// Operations are immediate and last-write-wins. An empty stored value reads
/// as no cart.
pub trait CartIdStore: Send + Sync {
    /// Read the stored cart ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be read.
    fn read(&self) -> Result<Option<CartId>, StoreError>;

    /// Store a cart ID, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be written.
    fn write(&self, cart_id: &CartId) -> Result<(), StoreError>;

    /// Forget the stored cart ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

fn non_empty(value: Option<String>) -> Option<CartId> {
    value.filter(|v| !v.is_empty()).map(CartId::from)
}

// =============================================================================
// In-memory store
// =============================================================================

/// Key-value store held in memory.
#[derive(Debug, Default)]
pub struct MemoryCartIdStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCartIdStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store already holding a cart ID.
    #[must_use]
    pub fn with_cart_id(cart_id: impl Into<String>) -> Self {
        let store = Self::default();
        store.set(cart_id.into());
        store
    }

    fn set(&self, value: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(CART_ID_STORAGE_KEY.to_string(), value);
    }
}

impl CartIdStore for MemoryCartIdStore {
    fn read(&self) -> Result<Option<CartId>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(non_empty(entries.get(CART_ID_STORAGE_KEY).cloned()))
    }

    fn write(&self, cart_id: &CartId) -> Result<(), StoreError> {
        self.set(cart_id.as_str().to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(CART_ID_STORAGE_KEY);
        Ok(())
    }
}

// =============================================================================
// File store
// =============================================================================

/// Key-value store persisted as a JSON object on disk.
///
/// Other keys in the file are preserved. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct FileCartIdStore {
    path: PathBuf,
}

impl FileCartIdStore {
    /// Store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl CartIdStore for FileCartIdStore {
    fn read(&self) -> Result<Option<CartId>, StoreError> {
        Ok(non_empty(self.load()?.remove(CART_ID_STORAGE_KEY)))
    }

    fn write(&self, cart_id: &CartId) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(CART_ID_STORAGE_KEY.to_string(), cart_id.as_str().to_string());
        self.save(&entries)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        if entries.remove(CART_ID_STORAGE_KEY).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}
