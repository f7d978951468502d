//! Driver seam
//!
//! The router treats the underlying database driver as an opaque
//! capability: it can open a persistent connection from a raw config value
//! and execute statements over it. Callers plug a real driver, tests plug
//! scripted mocks.
//!
//! Connection death is reported back to the pool as explicit events rather
//! than ambient mutation: the pool hands every new connection an
//! `EventSink`, and the driver calls `terminated` when the transport
//! closes or `fatal_error` when the protocol signals a failure after which
//! the connection must not be reused. Non-fatal statement failures are
//! plain `Err` returns from `execute` and do not touch the sink.

use crate::error::Result;
use crate::types::{ExecResult, Value};
use async_trait::async_trait;
use serde_json::Value as ConfigValue;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Why a pooled connection stopped being usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// The transport ended.
    Terminated,
    /// The driver flagged a protocol error as fatal.
    FatalError,
}

/// Eviction notice sent from a connection back to its pool.
#[derive(Debug)]
pub struct ConnectionEvent {
    pub(crate) key: String,
    pub(crate) conn_id: u64,
    pub(crate) reason: EvictReason,
}

/// Handle a driver uses to report connection death to the pool.
///
/// Cloneable and safe to fire from any task; sends are best-effort and
/// silently dropped once the owning pool is gone.
#[derive(Debug, Clone)]
pub struct EventSink {
    key: String,
    conn_id: u64,
    tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl EventSink {
    pub(crate) fn new(
        key: impl Into<String>,
        conn_id: u64,
        tx: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Self {
        Self {
            key: key.into(),
            conn_id,
            tx,
        }
    }

    /// The transport ended; the pooled handle must be dropped.
    pub fn terminated(&self) {
        self.send(EvictReason::Terminated);
    }

    /// The driver hit a fatal protocol error; the pooled handle must be
    /// dropped.
    pub fn fatal_error(&self) {
        self.send(EvictReason::FatalError);
    }

    fn send(&self, reason: EvictReason) {
        let _ = self.tx.send(ConnectionEvent {
            key: self.key.clone(),
            conn_id: self.conn_id,
            reason,
        });
    }
}

/// A live connection handle.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute one statement and return its raw result.
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult>;

    /// Close the underlying transport. Best-effort: called by the pool on
    /// dispose, after which the handle is dropped.
    async fn terminate(&self);
}

/// Opens connections from raw config values.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a persistent connection for the logical key `key` using the
    /// raw driver parameters in `config`. The returned handle stays owned
    /// by the pool; the driver keeps `events` and fires it when the
    /// connection dies.
    async fn connect(
        &self,
        key: &str,
        config: &ConfigValue,
        events: EventSink,
    ) -> Result<Arc<dyn Connection>>;
}
