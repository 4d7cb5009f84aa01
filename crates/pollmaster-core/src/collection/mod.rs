//! Role-gated CRUD over one record collection.
//!
//! Durable storage is the only copy of a collection. Every mutation takes the
//! write guard, re-reads the item, checks the [`WritePolicy`], applies against
//! the backend, then replaces and persists the whole collection. A refused or
//! failed mutation leaves storage untouched.

mod policy;

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Mutex as AsyncMutex;

use crate::api::{decode, path_segment, ApiReply};
use crate::error::{Error, Result};
use crate::models::{CollectionRecord, User};
use crate::session::SessionStore;
use crate::storage::{keys, load_json, save_json, KeyValueStore};

pub use policy::{WriteAction, WritePolicy, WriteRule};

/// Fields a patch may never overwrite.
const IMMUTABLE_FIELDS: &[&str] = &["id", "_id", "postedBy", "posted_by"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionBackend {
    /// REST endpoints `<prefix>/get`, `/create`, `/update/:id`, `/delete/:id`
    Remote { prefix: String },
    /// Device-only collection kept in durable storage
    Local,
}

impl CollectionBackend {
    pub fn remote(prefix: impl Into<String>) -> Self {
        Self::Remote {
            prefix: prefix.into(),
        }
    }

    /// Remote backend at `/<collection>`.
    pub fn remote_for<T: CollectionRecord>() -> Self {
        Self::remote(format!("/{}", T::COLLECTION))
    }
}

pub struct CollectionStore<T: CollectionRecord, S: KeyValueStore> {
    session: Arc<SessionStore<S>>,
    backend: CollectionBackend,
    policy: WritePolicy,
    writes: AsyncMutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T: CollectionRecord, S: KeyValueStore> CollectionStore<T, S> {
    /// Open the store over the session's durable storage.
    ///
    /// Fails early when the persisted collection cannot be decoded.
    pub fn new(session: Arc<SessionStore<S>>, backend: CollectionBackend) -> Result<Self> {
        let policy = session.config().write_policy.clone();
        let store = Self {
            session,
            backend,
            policy,
            writes: AsyncMutex::new(()),
            _record: PhantomData,
        };
        store.items()?;
        Ok(store)
    }

    #[must_use]
    pub fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn policy(&self) -> &WritePolicy {
        &self.policy
    }

    pub const fn backend(&self) -> &CollectionBackend {
        &self.backend
    }

    fn storage_key() -> String {
        keys::collection(T::COLLECTION)
    }

    /// Current snapshot of the collection, read from durable storage so a
    /// sign-out or token rejection is reflected immediately.
    pub fn items(&self) -> Result<Vec<T>> {
        Ok(load_json(self.session.storage(), &Self::storage_key())?.unwrap_or_default())
    }

    pub fn get(&self, id: &str) -> Result<Option<T>> {
        Ok(self.items()?.into_iter().find(|item| item.id() == id))
    }

    /// Reload the collection from its backend.
    pub async fn refresh(&self) -> Result<Vec<T>> {
        let _guard = self.writes.lock().await;
        self.reload().await
    }

    pub async fn add_item(&self, draft: T::Draft) -> Result<Vec<T>> {
        T::validate_draft(&draft)?;
        let _guard = self.writes.lock().await;
        let user = self.authorize(WriteAction::Create)?;

        match &self.backend {
            CollectionBackend::Local => {
                let id = uuid::Uuid::now_v7().to_string();
                tracing::info!("{} added {} item {}", user.id, T::COLLECTION, id);
                let item = T::from_draft(id, user.id, draft);
                let mut next = self.items()?;
                next.push(item);
                self.replace(&next)?;
                Ok(next)
            }
            CollectionBackend::Remote { prefix } => {
                let body = serde_json::to_value(&draft)?;
                let path = format!("{prefix}/create");
                let token = self.session_token()?;
                let reply = self.session.api().post(&path, &body, Some(&token)).await?;
                self.expect_success(reply).await?;
                self.reload().await
            }
        }
    }

    /// Merge `patch` over the item with `id`; `id` and `posted_by` never change.
    pub async fn update_item(&self, id: &str, patch: T::Patch) -> Result<Vec<T>> {
        let _guard = self.writes.lock().await;
        let existing = self.require(id).await?;
        self.authorize(WriteAction::Modify {
            posted_by: existing.posted_by(),
        })?;

        match &self.backend {
            CollectionBackend::Local => {
                let merged: T = merge_patch(&existing, &patch)?;
                let next: Vec<T> = self
                    .items()?
                    .into_iter()
                    .map(|item| if item.id() == id { merged.clone() } else { item })
                    .collect();
                tracing::info!("Updated {} item {}", T::COLLECTION, id);
                self.replace(&next)?;
                Ok(next)
            }
            CollectionBackend::Remote { prefix } => {
                let body = serde_json::to_value(&patch)?;
                let path = format!("{prefix}/update/{}", path_segment(id));
                let token = self.session_token()?;
                let reply = self.session.api().put(&path, &body, Some(&token)).await?;
                self.expect_success(reply).await?;
                self.reload().await
            }
        }
    }

    pub async fn delete_item(&self, id: &str) -> Result<Vec<T>> {
        let _guard = self.writes.lock().await;
        let existing = self.require(id).await?;
        self.authorize(WriteAction::Modify {
            posted_by: existing.posted_by(),
        })?;

        match &self.backend {
            CollectionBackend::Local => {
                let next: Vec<T> = self
                    .items()?
                    .into_iter()
                    .filter(|item| item.id() != id)
                    .collect();
                tracing::info!("Deleted {} item {}", T::COLLECTION, id);
                self.replace(&next)?;
                Ok(next)
            }
            CollectionBackend::Remote { prefix } => {
                let path = format!("{prefix}/delete/{}", path_segment(id));
                let token = self.session_token()?;
                let reply = self.session.api().delete(&path, Some(&token)).await?;
                self.expect_success(reply).await?;
                self.reload().await
            }
        }
    }

    /// Callers hold `writes`.
    async fn reload(&self) -> Result<Vec<T>> {
        match &self.backend {
            CollectionBackend::Local => self.items(),
            CollectionBackend::Remote { prefix } => {
                let path = format!("{prefix}/get");
                let token = self.session.current_token()?;
                let reply = self.session.api().get(&path, token.as_deref()).await?;
                let data = self.expect_success(reply).await?;
                let items = decode::<Vec<T>>(extract_items(data))?;
                tracing::debug!("Fetched {} {} items", items.len(), T::COLLECTION);
                self.replace(&items)?;
                Ok(items)
            }
        }
    }

    fn replace(&self, next: &[T]) -> Result<()> {
        save_json(self.session.storage(), &Self::storage_key(), next)
    }

    /// Look `id` up, refetching a remote collection once before giving up.
    /// Callers hold `writes`.
    async fn require(&self, id: &str) -> Result<T> {
        if let Some(item) = self.get(id)? {
            return Ok(item);
        }
        if matches!(self.backend, CollectionBackend::Remote { .. }) {
            tracing::debug!("{} item {} not cached; refetching", T::COLLECTION, id);
            if let Some(item) = self.reload().await?.into_iter().find(|item| item.id() == id) {
                return Ok(item);
            }
        }
        Err(Error::NotFound(format!("No {} item with id {id}", T::COLLECTION)))
    }

    fn authorize(&self, action: WriteAction<'_>) -> Result<User> {
        let Some(user) = self.session.user() else {
            return Err(Error::Unauthorized("Please sign in first".to_string()));
        };
        if self.policy.permits(Some(&user), action) {
            Ok(user)
        } else {
            tracing::debug!("Refused {} write for {} ({})", T::COLLECTION, user.id, user.role);
            Err(Error::Unauthorized(format!(
                "You don't have permission to modify {}",
                T::COLLECTION
            )))
        }
    }

    fn session_token(&self) -> Result<String> {
        self.session
            .current_token()?
            .ok_or_else(|| Error::Unauthorized("Please sign in first".to_string()))
    }

    async fn expect_success(&self, reply: ApiReply) -> Result<Value> {
        if reply.is_auth_rejection() {
            return Err(self.session.recheck_after_rejection(reply).await);
        }
        reply.into_success()
    }
}

/// Accepts a bare array, `{items: [...]}`, or a single-array object.
fn extract_items(data: Value) -> Value {
    match data {
        Value::Object(mut map) => {
            if let Some(items) = map.remove("items") {
                return items;
            }
            let mut arrays = map.into_iter().filter(|(_, value)| value.is_array());
            match (arrays.next(), arrays.next()) {
                (Some((_, items)), None) => items,
                _ => Value::Array(Vec::new()),
            }
        }
        Value::Null => Value::Array(Vec::new()),
        other => other,
    }
}

fn merge_patch<T: CollectionRecord>(existing: &T, patch: &T::Patch) -> Result<T> {
    let Value::Object(mut merged) = serde_json::to_value(existing)? else {
        return Err(Error::Validation(format!(
            "{} items must serialize as objects",
            T::COLLECTION
        )));
    };
    let changes = match serde_json::to_value(patch)? {
        Value::Object(changes) => changes,
        Value::Null => Map::new(),
        _ => return Err(Error::Validation("Patch must be an object".to_string())),
    };
    for (key, value) in changes {
        if IMMUTABLE_FIELDS.contains(&key.as_str()) || value.is_null() {
            continue;
        }
        merged.insert(key, value);
    }
    Ok(serde_json::from_value(Value::Object(merged))?)
}

#[cfg(test)]
mod tests;
