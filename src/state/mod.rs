use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::record_store::RecordStore,
    error::ServiceError,
    services::cascade::{CascadeService, CascadeSettings},
};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state storing the record store handle and degraded flag.
pub struct AppState {
    record_store: RwLock<Option<Arc<dyn RecordStore>>>,
    degraded: watch::Sender<bool>,
    cascade_settings: CascadeSettings,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: &AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            record_store: RwLock::new(None),
            degraded: degraded_tx,
            cascade_settings: config.cascade(),
        })
    }

    /// Obtain a handle to the current record store, if one is installed.
    pub async fn record_store(&self) -> Option<Arc<dyn RecordStore>> {
        let guard = self.record_store.read().await;
        guard.as_ref().cloned()
    }

    /// Like [`AppState::record_store`], failing with [`ServiceError::Degraded`] when absent.
    pub async fn require_record_store(&self) -> Result<Arc<dyn RecordStore>, ServiceError> {
        self.record_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new record store implementation and leave degraded mode.
    pub async fn install_record_store(&self, store: Arc<dyn RecordStore>) {
        {
            let mut guard = self.record_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Cascade service bound to the installed store.
    pub async fn cascade_service(&self) -> Result<CascadeService, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        let store = self.require_record_store().await?;
        Ok(CascadeService::new(store, self.cascade_settings))
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::record_store::memory::InMemoryRecordStore;

    #[tokio::test]
    async fn starts_degraded_without_a_store() {
        let state = AppState::new(&AppConfig::default());

        assert!(state.is_degraded());
        assert!(matches!(
            state.cascade_service().await,
            Err(ServiceError::Degraded)
        ));
    }

    #[tokio::test]
    async fn installing_a_store_leaves_degraded_mode() {
        let state = AppState::new(&AppConfig::default());
        let mut watcher = state.degraded_watcher();

        state
            .install_record_store(Arc::new(InMemoryRecordStore::new()))
            .await;

        assert!(!state.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        let service = state.cascade_service().await.unwrap();
        assert_eq!(service.settings(), CascadeSettings::default());
    }

    #[tokio::test]
    async fn degraded_flag_blocks_cascades_while_store_is_kept() {
        let state = AppState::new(&AppConfig::default());
        state
            .install_record_store(Arc::new(InMemoryRecordStore::new()))
            .await;

        state.update_degraded(true);

        assert!(state.record_store().await.is_some());
        assert!(matches!(
            state.cascade_service().await,
            Err(ServiceError::Degraded)
        ));
    }
}
