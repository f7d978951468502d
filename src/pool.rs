//! Connection pool
//!
//! Per-adapter cache of live connection handles, keyed by the logical
//! configuration key each connection was created from (never by topology
//! role). Connections are created lazily on first resolution, reused
//! across queries, and dropped when the driver reports termination or a
//! fatal error, or when the adapter is disposed.
//!
//! Eviction is event-driven: drivers push `ConnectionEvent`s into an
//! unbounded channel and the pool drains it at the top of every `resolve`,
//! which is the single choke point through which handles leave the pool.
//! Draining before lookup keeps the invariant that `resolve` never returns
//! a dead handle.

use crate::config::ConfigSource;
use crate::driver::{Connection, ConnectionEvent, Driver, EventSink};
use crate::error::{Result, RouteError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

struct PooledEntry {
    conn_id: u64,
    conn: Arc<dyn Connection>,
}

struct PoolInner {
    conns: HashMap<String, PooledEntry>,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
}

/// Per-adapter connection cache with event-driven eviction.
pub struct ConnectionPool {
    source: Arc<dyn ConfigSource>,
    driver: Arc<dyn Driver>,
    /// Bumped on every resolution, fresh or pooled. Consumed by replica
    /// round-robin selection. Instance-scoped: nothing coordinates this
    /// counter across adapter instances or processes, and it resets with
    /// the adapter.
    seq: AtomicU64,
    next_conn_id: AtomicU64,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    inner: Mutex<PoolInner>,
}

impl ConnectionPool {
    pub fn new(source: Arc<dyn ConfigSource>, driver: Arc<dyn Driver>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            source,
            driver,
            seq: AtomicU64::new(0),
            next_conn_id: AtomicU64::new(0),
            events_tx,
            inner: Mutex::new(PoolInner {
                conns: HashMap::new(),
                events: events_rx,
            }),
        }
    }

    /// Live connection for `key`, pooled or freshly created.
    ///
    /// Every call increments the sequence counter, whether or not a new
    /// connection is created. Pending eviction events are applied before
    /// the lookup, so a handle whose driver already reported death is
    /// never returned.
    pub async fn resolve(&self, key: &str) -> Result<Arc<dyn Connection>> {
        self.next();

        let mut inner = self.inner.lock().await;
        Self::drain_events(&mut inner);

        if let Some(entry) = inner.conns.get(key) {
            return Ok(entry.conn.clone());
        }

        let config = self
            .source
            .get(key)
            .ok_or_else(|| RouteError::config(key, "no configuration found"))?;
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::SeqCst);
        let sink = EventSink::new(key, conn_id, self.events_tx.clone());
        let conn = self.driver.connect(key, &config, sink).await?;
        debug!(key, conn_id, "connection created");
        inner.conns.insert(
            key.to_string(),
            PooledEntry {
                conn_id,
                conn: conn.clone(),
            },
        );
        Ok(conn)
    }

    /// Current sequence counter value. Replica selection reads this before
    /// its own resolution's increment, so the first query on a fresh
    /// adapter lands on the first slave.
    pub fn sequence(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// Advance the sequence counter, returning the pre-increment value.
    pub(crate) fn next(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Number of pooled connections. Pending evictions are applied first.
    pub async fn size(&self) -> usize {
        let mut inner = self.inner.lock().await;
        Self::drain_events(&mut inner);
        inner.conns.len()
    }

    /// Terminate and drop every pooled connection. Best-effort and
    /// idempotent: termination failures are the driver's to swallow, and a
    /// disposed pool simply starts empty again on the next `resolve`.
    pub async fn dispose(&self) {
        let mut inner = self.inner.lock().await;
        Self::drain_events(&mut inner);
        for (key, entry) in inner.conns.drain() {
            debug!(key = key.as_str(), "terminating pooled connection");
            entry.conn.terminate().await;
        }
    }

    /// Apply queued eviction notices. An event only evicts the entry it
    /// was issued for: a stale notice for an already-replaced connection
    /// must not take down its successor under the same key.
    fn drain_events(inner: &mut PoolInner) {
        while let Ok(event) = inner.events.try_recv() {
            let evict = inner
                .conns
                .get(&event.key)
                .is_some_and(|entry| entry.conn_id == event.conn_id);
            if evict {
                inner.conns.remove(&event.key);
                debug!(
                    key = event.key.as_str(),
                    reason = ?event.reason,
                    "connection evicted"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigSource;
    use crate::types::ExecResult;
    use crate::types::Value;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    struct TestConnection {
        terminations: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connection for TestConnection {
        async fn execute(&self, _sql: &str, _args: &[Value]) -> Result<ExecResult> {
            Ok(ExecResult::default())
        }

        async fn terminate(&self) {
            self.terminations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct TestDriver {
        connects: StdMutex<Vec<String>>,
        sinks: StdMutex<Vec<EventSink>>,
        terminations: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Driver for TestDriver {
        async fn connect(
            &self,
            key: &str,
            _config: &serde_json::Value,
            events: EventSink,
        ) -> Result<Arc<dyn Connection>> {
            self.connects.lock().unwrap().push(key.to_string());
            self.sinks.lock().unwrap().push(events);
            Ok(Arc::new(TestConnection {
                terminations: self.terminations.clone(),
            }))
        }
    }

    fn pool_with(keys: &[&str]) -> (ConnectionPool, Arc<TestDriver>) {
        let mut source = MemoryConfigSource::new();
        for key in keys {
            source.set(*key, json!({"host": *key}));
        }
        let driver = Arc::new(TestDriver::default());
        let pool = ConnectionPool::new(Arc::new(source), driver.clone());
        (pool, driver)
    }

    #[tokio::test]
    async fn test_resolve_reuses_pooled_connection() {
        let (pool, driver) = pool_with(&["a"]);

        let first = pool.resolve("a").await.unwrap();
        let second = pool.resolve("a").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(driver.connects.lock().unwrap().len(), 1);
        // The counter advances on reuse too.
        assert_eq!(pool.sequence(), 2);
    }

    #[tokio::test]
    async fn test_resolve_unknown_key_fails() {
        let (pool, driver) = pool_with(&[]);
        assert!(pool.resolve("ghost").await.is_err());
        assert!(driver.connects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fatal_event_evicts() {
        let (pool, driver) = pool_with(&["a"]);

        let first = pool.resolve("a").await.unwrap();
        driver.sinks.lock().unwrap()[0].fatal_error();

        let second = pool.resolve("a").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(driver.connects.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_event_spares_successor() {
        let (pool, driver) = pool_with(&["a"]);

        pool.resolve("a").await.unwrap();
        driver.sinks.lock().unwrap()[0].terminated();
        let replacement = pool.resolve("a").await.unwrap();

        // A second notice from the dead connection must not evict the
        // replacement pooled under the same key.
        driver.sinks.lock().unwrap()[0].terminated();
        let still_pooled = pool.resolve("a").await.unwrap();

        assert!(Arc::ptr_eq(&replacement, &still_pooled));
        assert_eq!(driver.connects.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dispose_terminates_and_clears() {
        let (pool, driver) = pool_with(&["a", "b"]);

        pool.resolve("a").await.unwrap();
        pool.resolve("b").await.unwrap();
        assert_eq!(pool.size().await, 2);

        pool.dispose().await;
        assert_eq!(pool.size().await, 0);
        assert_eq!(driver.terminations.load(Ordering::SeqCst), 2);

        // Idempotent.
        pool.dispose().await;
        assert_eq!(driver.terminations.load(Ordering::SeqCst), 2);

        // A disposed pool transparently reconnects.
        pool.resolve("a").await.unwrap();
        assert_eq!(pool.size().await, 1);
        assert_eq!(driver.connects.lock().unwrap().len(), 3);
    }
}
