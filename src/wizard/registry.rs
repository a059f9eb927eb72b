//! Wizard session registry
//!
//! Sessions live in a moka cache and are dropped after a period without
//! access. Each session sits behind its own async mutex; a caller that cannot
//! take it immediately is told the session is busy instead of queueing a
//! second submission behind the first.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Wizard, WizardFlow};

/// Maximum number of concurrent sessions per entity kind
const DEFAULT_MAX_SESSIONS: u64 = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Wizard session not found or expired")]
    NotFound,

    #[error("A submission for this session is already in progress")]
    Busy,
}

pub struct WizardRegistry<F: WizardFlow> {
    sessions: Cache<Uuid, Arc<Mutex<Wizard<F>>>>,
}

impl<F: WizardFlow> std::fmt::Debug for WizardRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardRegistry")
            .field("kind", &F::KIND)
            .field("entry_count", &self.sessions.entry_count())
            .finish()
    }
}

impl<F: WizardFlow> WizardRegistry<F> {
    pub fn new(idle: Duration) -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS, idle)
    }

    pub fn with_capacity(max_capacity: u64, idle: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(idle)
            .build();
        Self { sessions }
    }

    /// Register a session and return its id
    pub async fn insert(&self, wizard: Wizard<F>) -> Uuid {
        let id = Uuid::new_v4();
        tracing::debug!(kind = F::KIND, session = %id, mode = ?wizard.mode(), "Opened wizard session");
        self.sessions.insert(id, Arc::new(Mutex::new(wizard))).await;
        id
    }

    /// Wait for exclusive access, e.g. to render a view
    pub async fn lock(&self, id: Uuid) -> Result<OwnedMutexGuard<Wizard<F>>, RegistryError> {
        let session = self.sessions.get(&id).await.ok_or(RegistryError::NotFound)?;
        Ok(session.lock_owned().await)
    }

    /// Exclusive access for a change; fails fast while another one runs
    pub async fn try_lock(&self, id: Uuid) -> Result<OwnedMutexGuard<Wizard<F>>, RegistryError> {
        let session = self.sessions.get(&id).await.ok_or(RegistryError::NotFound)?;
        session.try_lock_owned().map_err(|_| {
            tracing::debug!(kind = F::KIND, session = %id, "Rejected concurrent wizard request");
            RegistryError::Busy
        })
    }

    /// Take a session out of the registry
    pub async fn remove(&self, id: Uuid) -> Option<Arc<Mutex<Wizard<F>>>> {
        self.sessions.remove(&id).await
    }

    pub fn entry_count(&self) -> u64 {
        self.sessions.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StagingConfig;
    use crate::gateway::MemoryBackend;
    use crate::staging::StagedImageStore;
    use crate::wizard::{ImageResolver, NewsFlow};

    fn wizard() -> Wizard<NewsFlow> {
        let backend = Arc::new(MemoryBackend::new());
        let store = Arc::new(StagedImageStore::new(&StagingConfig::default()));
        let resolver = ImageResolver::new(store, backend.clone(), backend.clone());
        Wizard::create(NewsFlow::new(backend), resolver, "placeholders/default.png")
    }

    #[tokio::test]
    async fn test_second_change_is_rejected_while_first_holds_session() {
        let registry = WizardRegistry::new(Duration::from_secs(60));
        let id = registry.insert(wizard()).await;

        let held = registry.try_lock(id).await.unwrap();
        assert!(matches!(registry.try_lock(id).await, Err(RegistryError::Busy)));

        drop(held);
        assert!(registry.try_lock(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_and_removed_sessions() {
        let registry = WizardRegistry::<NewsFlow>::new(Duration::from_secs(60));
        assert!(matches!(
            registry.lock(Uuid::new_v4()).await,
            Err(RegistryError::NotFound)
        ));

        let id = registry.insert(wizard()).await;
        assert!(registry.remove(id).await.is_some());
        assert!(matches!(registry.try_lock(id).await, Err(RegistryError::NotFound)));
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let registry = WizardRegistry::new(Duration::from_millis(20));
        let id = registry.insert(wizard()).await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        registry.sessions.run_pending_tasks().await;

        assert!(matches!(registry.lock(id).await, Err(RegistryError::NotFound)));
    }
}
