use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use lavender_shared::{ColorRegistry, MapVariant};
use tokio::sync::Mutex;

use crate::store::{KvStore, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub store: KvStore,
    /// Last successfully read or written mapping list per variant.
    pub registries: Arc<DashMap<MapVariant, ColorRegistry>>,
    /// Serializes read-modify-write cycles on the mapping lists.
    pub write_lock: Arc<Mutex<()>>,
    pub admin_token: Option<Arc<str>>,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    registry_reads_total: AtomicU64,
    registry_writes_total: AtomicU64,
    store_failures_total: AtomicU64,
    rejected_writes_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub registry_reads_total: u64,
    pub registry_writes_total: u64,
    pub store_failures_total: u64,
    pub rejected_writes_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            registry_reads_total: self.registry_reads_total.load(Ordering::Relaxed),
            registry_writes_total: self.registry_writes_total.load(Ordering::Relaxed),
            store_failures_total: self.store_failures_total.load(Ordering::Relaxed),
            rejected_writes_total: self.rejected_writes_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_registry_read(&self) {
        self.registry_reads_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_registry_write(&self) {
        self.registry_writes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_write(&self) {
        self.rejected_writes_total.fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(store: KvStore, admin_token: Option<String>) -> Self {
        Self {
            store,
            registries: Arc::new(DashMap::new()),
            write_lock: Arc::new(Mutex::new(())),
            admin_token: admin_token.map(Arc::from),
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    /// Current mappings for `variant`, loading from the store on first use.
    pub async fn registry(&self, variant: MapVariant) -> Result<ColorRegistry, StoreError> {
        if let Some(cached) = self.registries.get(&variant) {
            return Ok(cached.value().clone());
        }
        let loaded: ColorRegistry = self
            .store
            .get_json(variant.storage_key())
            .await?
            .unwrap_or_default();
        Ok(self.cache_loaded(variant, loaded))
    }

    /// Cache a cold read unless a commit landed while it was in flight, in
    /// which case the committed list wins.
    fn cache_loaded(&self, variant: MapVariant, loaded: ColorRegistry) -> ColorRegistry {
        self.registries
            .entry(variant)
            .or_insert(loaded)
            .value()
            .clone()
    }

    /// Persist `registry` and only then update the cache, so a failed write
    /// leaves the served mappings unchanged.
    pub async fn commit_registry(
        &self,
        variant: MapVariant,
        registry: ColorRegistry,
    ) -> Result<(), StoreError> {
        if let Err(e) = self.store.set_json(variant.storage_key(), &registry).await {
            self.observability.record_store_failure();
            return Err(e);
        }
        self.registries.insert(variant, registry);
        self.observability.record_registry_write();
        Ok(())
    }
}
