//! Key-value persistence for wellsync
//!
//! Provides the [`Storage`] trait that synced resources persist through, two
//! backends ([`MemoryStorage`], [`FileStorage`]), a pluggable [`Codec`] for
//! turning values into stored text, and helpers that attach the key and
//! operation to every failure.
//!
//! # Example
//!
//! ```ignore
//! use wellsync_storage::{Codec, FileStorage, load_from_storage, save_to_storage};
//!
//! let store = FileStorage::new("/var/lib/wellsync");
//! let codec = Codec::json();
//! save_to_storage(&store, "prefs", &prefs, &codec).await?;
//! let prefs = load_from_storage(&store, "prefs", Prefs::default(), &codec).await?;
//! ```

mod backends;
mod codec;
mod error;

pub use backends::{FileStorage, MemoryStorage};
pub use codec::Codec;
pub use error::{Result, StorageError};

use async_trait::async_trait;
use tracing::debug;

/// A durable string key-value store.
///
/// Implementors must provide:
/// - [`get_item`](Storage::get_item) - `None` when the key was never written
/// - [`set_item`](Storage::set_item) - Replace the value for a key
/// - [`remove_item`](Storage::remove_item) - Delete a key; absent keys are not an error
/// - [`backend_name`](Storage::backend_name) - Identifier for logs
///
/// Errors returned here are backend-level ([`StorageError::Io`] and the like);
/// the free functions in this crate wrap them with the key and operation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the raw value stored under `key`.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`.
    async fn set_item(&self, key: &str, value: String) -> Result<()>;

    /// Delete the value stored under `key`.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Backend identifier, e.g. `"file"` or `"memory"`.
    fn backend_name(&self) -> &'static str;
}

/// Load and decode the value under `key`, or `fallback` if nothing is stored.
///
/// # Errors
///
/// Returns [`StorageError::Load`] if the backend read or the decode fails.
pub async fn load_from_storage<T, S>(
    storage: &S,
    key: &str,
    fallback: T,
    codec: &Codec<T>,
) -> Result<T>
where
    S: Storage + ?Sized,
{
    let stored = storage
        .get_item(key)
        .await
        .map_err(|e| StorageError::load(key, e))?;

    match stored {
        Some(raw) => codec.decode(key, &raw).map_err(|e| StorageError::load(key, e)),
        None => {
            debug!(key, backend = storage.backend_name(), "No stored value, using fallback");
            Ok(fallback)
        }
    }
}

/// Encode `value` and store it under `key`.
///
/// # Errors
///
/// Returns [`StorageError::Save`] if encoding or the backend write fails.
pub async fn save_to_storage<T, S>(storage: &S, key: &str, value: &T, codec: &Codec<T>) -> Result<()>
where
    S: Storage + ?Sized,
{
    let raw = codec
        .encode(key, value)
        .map_err(|e| StorageError::save(key, e))?;
    storage
        .set_item(key, raw)
        .await
        .map_err(|e| StorageError::save(key, e))
}

/// Delete the value stored under `key`.
///
/// # Errors
///
/// Returns [`StorageError::Remove`] if the backend delete fails.
pub async fn remove_from_storage<S>(storage: &S, key: &str) -> Result<()>
where
    S: Storage + ?Sized,
{
    storage
        .remove_item(key)
        .await
        .map_err(|e| StorageError::remove(key, e))
}
