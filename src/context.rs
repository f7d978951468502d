//! Adapter context
//!
//! Bundles one shared `ConfigSource` and `Driver` and hands out adapters
//! bound to them, keeping track of everything it created so the whole set
//! can be released in one call.

use crate::adapter::SqlAdapter;
use crate::config::ConfigSource;
use crate::driver::Driver;
use crate::error::Result;
use crate::topology::Topology;
use std::sync::Arc;
use std::sync::Mutex;

/// Factory and registry for adapters sharing one config source and driver.
pub struct Context {
    source: Arc<dyn ConfigSource>,
    driver: Arc<dyn Driver>,
    adapters: Mutex<Vec<Arc<SqlAdapter>>>,
}

impl Context {
    pub fn new(source: Arc<dyn ConfigSource>, driver: Arc<dyn Driver>) -> Self {
        Self {
            source,
            driver,
            adapters: Mutex::new(Vec::new()),
        }
    }

    /// Adapter for a single-node target.
    pub fn single(&self, key: impl Into<String>) -> Result<Arc<SqlAdapter>> {
        self.track(Topology::Single, key.into())
    }

    /// Adapter for a primary/replica target.
    pub fn replica(&self, key: impl Into<String>) -> Result<Arc<SqlAdapter>> {
        self.track(Topology::Replica, key.into())
    }

    /// Adapter for a range-sharded target.
    pub fn shard(&self, key: impl Into<String>) -> Result<Arc<SqlAdapter>> {
        self.track(Topology::Shard, key.into())
    }

    /// Number of adapters currently tracked.
    pub fn len(&self) -> usize {
        self.adapters.lock().expect("context lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispose every tracked adapter and forget them. Best-effort and
    /// idempotent, like the per-adapter `dispose`.
    pub async fn dispose(&self) {
        let adapters = std::mem::take(
            &mut *self.adapters.lock().expect("context lock poisoned"),
        );
        for adapter in adapters {
            adapter.dispose().await;
        }
    }

    fn track(&self, topology: Topology, key: String) -> Result<Arc<SqlAdapter>> {
        let adapter = Arc::new(SqlAdapter::new(
            topology,
            key,
            self.source.clone(),
            self.driver.clone(),
        )?);
        self.adapters
            .lock()
            .expect("context lock poisoned")
            .push(adapter.clone());
        Ok(adapter)
    }
}
