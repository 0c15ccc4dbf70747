//! Async surface over the shared store
//!
//! Lock waits and file I/O run on tokio's blocking pool so callers on the
//! async scheduler are suspended instead of stalling it. Data semantics are
//! those of the blocking [`ConfigStore`] this wraps.

use crate::config::{ConfigSnapshot, UpdateRequest};
use crate::session::Session;
use crate::store::{ConfigStore, UpdateOutcome};
use crate::types::{Result, StoreError};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub struct AsyncConfigStore {
    inner: Arc<ConfigStore>,
}

impl AsyncConfigStore {
    pub fn new(inner: Arc<ConfigStore>) -> Self {
        Self { inner }
    }

    /// The blocking store behind this handle.
    pub fn blocking(&self) -> &Arc<ConfigStore> {
        &self.inner
    }

    pub async fn update(&self, request: UpdateRequest) -> Result<UpdateOutcome> {
        self.run(move |store| store.update(request)).await?
    }

    pub async fn reset(&self) -> Result<UpdateOutcome> {
        self.run(|store| store.reset()).await?
    }

    pub async fn snapshot(&self) -> Arc<ConfigSnapshot> {
        // Without disk refresh a read is a lock-free pointer load.
        if !self.inner.settings().refresh_from_disk {
            return self.inner.snapshot();
        }

        match self.run(|store| store.snapshot()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Snapshot task failed, serving cached configuration: {}", e);
                self.inner.cached()
            }
        }
    }

    pub async fn load(&self) -> ConfigSnapshot {
        (*self.snapshot().await).clone()
    }

    pub async fn get(&self, key: &str, default: Value) -> Value {
        self.snapshot().await.get(key).unwrap_or(default)
    }

    pub async fn get_str(&self, key: &str, default: &str) -> String {
        match self.snapshot().await.get(key) {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => default.to_string(),
        }
    }

    pub async fn begin_session(&self) -> Session {
        Session::new(self.snapshot().await)
    }

    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ConfigStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))
    }
}
