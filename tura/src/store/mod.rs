//! Key/value persistence backends.
//!
//! [`Store`] is the stand-in for the browser's `localStorage` and
//! `sessionStorage`: a flat, string-keyed, string-valued map. The wallet
//! keeps its durable records (encrypted keys, wallet records, the current
//! wallet pointer) in one store and the login session in another, usually
//! ephemeral, store.
//!
//! Two backends are provided:
//!
//! - [`MemoryStore`] - fast, never touches disk, lost on drop.
//! - [`FileStore`] - one file per key under a base directory.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Async trait for string key/value storage.
///
/// All implementations must be `Send + Sync` for use across async tasks.
/// Writes are not transactional; callers that need durability guarantees
/// read the value back after writing it.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Backend identifier used in logs and errors.
    fn backend(&self) -> &'static str;

    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// List all keys.
    async fn keys(&self) -> StoreResult<Vec<String>>;

    /// Check if a key exists.
    async fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// A shared, reference-counted store for use across components.
pub type SharedStore = Arc<dyn Store>;

/// Put `key` back to `prior`, removing it when there was no prior value.
///
/// Used to roll back a write whose read-back did not verify.
pub(crate) async fn restore(
    store: &dyn Store,
    key: &str,
    prior: Option<&str>,
) -> StoreResult<()> {
    match prior {
        Some(value) => store.set(key, value).await,
        None => store.remove(key).await,
    }
}
