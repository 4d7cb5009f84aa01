//! Durable key-value storage for session and collection state.
//!
//! Values are JSON strings under fixed keys. Session state and cached
//! collections are written only by the session and collection stores; the
//! poll board keeps its own snapshot key that survives sign-out.

mod file;
mod memory;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER: &str = "user";
    pub const POLLS: &str = "polls";
    pub const COLLECTION_PREFIX: &str = "collection:";

    pub fn collection(name: &str) -> String {
        format!("{COLLECTION_PREFIX}{name}")
    }

    /// Keys owned by the signed-in session and wiped with it.
    pub fn is_session_key(key: &str) -> bool {
        key == TOKEN || key == USER || key.starts_with(COLLECTION_PREFIX)
    }
}

pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

pub fn load_json<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &impl KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// Remove every session-owned key, leaving unrelated state in place.
pub fn clear_session_keys(store: &impl KeyValueStore) -> Result<()> {
    for key in store.keys()? {
        if keys::is_session_key(&key) {
            store.remove(&key)?;
        }
    }
    Ok(())
}
