//! SQL adapter facade
//!
//! `SqlAdapter` is the public query surface: it owns a connection pool and
//! a declared topology, routes each query to the right connection(s), and
//! merges per-connection results into one logical result.
//!
//! Routing re-reads the relevant replica/shard configs from the
//! `ConfigSource` on every call; nothing is cached beyond the pooled
//! connections themselves, so config changes take effect on the next
//! query.

use crate::config::ConfigSource;
use crate::driver::{Connection, Driver};
use crate::error::{Result, RouteError};
use crate::pool::ConnectionPool;
use crate::topology::{validate, ReplicaConfig, ShardConfig, Topology};
use crate::types::{QueryOption, QueryResult, Row, ShardTarget, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default aggregation key column for `query_map`.
const DEFAULT_ID_COLUMN: &str = "id";

/// Topology-aware query adapter for one logical database target.
pub struct SqlAdapter {
    key: String,
    topology: Topology,
    source: Arc<dyn ConfigSource>,
    pool: ConnectionPool,
}

impl std::fmt::Debug for SqlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlAdapter")
            .field("key", &self.key)
            .field("topology", &self.topology)
            .finish_non_exhaustive()
    }
}

impl SqlAdapter {
    /// Build an adapter for the config stored at `key`, declared to have
    /// the given topology.
    ///
    /// The whole topology graph is validated here, never lazily, so
    /// malformed configuration surfaces before any connection attempt.
    pub fn new(
        topology: Topology,
        key: impl Into<String>,
        source: Arc<dyn ConfigSource>,
        driver: Arc<dyn Driver>,
    ) -> Result<Self> {
        let key = key.into();
        validate(&key, topology, source.as_ref())?;
        Ok(Self {
            key,
            topology,
            source: source.clone(),
            pool: ConnectionPool::new(source, driver),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Current value of this adapter's resolution counter. Increments on
    /// every connection resolution and drives replica round-robin;
    /// instance-scoped and reset with the adapter.
    pub fn sequence(&self) -> u64 {
        self.pool.sequence()
    }

    /// Execute one statement against the connection(s) this adapter's
    /// topology selects and merge the per-connection results.
    ///
    /// Multi-connection execution (shard fan-out) is strictly sequential
    /// in member order. Any per-connection failure aborts the whole call
    /// and discards earlier partial results.
    pub async fn query(
        &self,
        sql: &str,
        args: &[Value],
        option: &QueryOption,
    ) -> Result<QueryResult> {
        match self.topology {
            Topology::Single => {
                let conn = self.pool.resolve(&self.key).await?;
                let result = conn.execute(sql, args).await?;
                Ok(result.into())
            }
            Topology::Replica => {
                let conn = self.resolve_replica(&self.key, option).await?;
                let result = conn.execute(sql, args).await?;
                Ok(result.into())
            }
            Topology::Shard => self.query_shard(sql, args, option).await,
        }
    }

    /// Batch lookup keyed by a result column.
    ///
    /// Each id runs as its own `query` with the one-element argument list
    /// `[id]`, sequentially in input order. When `shard_of` is unset it
    /// defaults per id: numeric ids route to their owning shard, anything
    /// else fans out to all members. Every produced row whose `id_column`
    /// (default `"id"`) is present and non-null lands in the map under the
    /// stringified column value; the last row wins on collision. Ids that
    /// produced no matching row are simply absent.
    pub async fn query_map(
        &self,
        sql: &str,
        ids: &[Value],
        option: &QueryOption,
    ) -> Result<HashMap<String, Row>> {
        let id_column = option.id_column.as_deref().unwrap_or(DEFAULT_ID_COLUMN);
        let mut map = HashMap::new();
        for id in ids {
            let mut opt = option.clone();
            if opt.shard_of.is_none() {
                opt.shard_of = Some(match id.as_i64() {
                    Some(n) => ShardTarget::Id(n),
                    None => ShardTarget::All,
                });
            }
            let result = self.query(sql, std::slice::from_ref(id), &opt).await?;
            for row in result.rows {
                if let Some(map_key) = row.get(id_column).and_then(Value::as_key) {
                    map.insert(map_key, row);
                }
            }
        }
        Ok(map)
    }

    /// Terminate and drop every pooled connection.
    ///
    /// Idempotent, never fails, safe from any state. Disposal is not
    /// terminal: a later `query` transparently re-creates connections from
    /// the then-current configuration.
    pub async fn dispose(&self) {
        self.pool.dispose().await;
    }

    async fn query_shard(
        &self,
        sql: &str,
        args: &[Value],
        option: &QueryOption,
    ) -> Result<QueryResult> {
        let config = ShardConfig::load(&self.key, self.source.as_ref())?;
        match option.shard_of {
            None => Err(RouteError::topology(format!(
                "shard_of option is required for shard adapter '{}'",
                self.key
            ))),
            Some(ShardTarget::Id(id)) => {
                let member = config.member_for(id)?;
                let conn = self.resolve_replica(member, option).await?;
                let result = conn.execute(sql, args).await?;
                Ok(result.into())
            }
            Some(ShardTarget::All) => {
                debug!(
                    key = self.key.as_str(),
                    members = config.members.len(),
                    "fanning out to all shard members"
                );
                let mut merged = QueryResult::default();
                for member in &config.members {
                    let conn = self.resolve_replica(member, option).await?;
                    merged.absorb(conn.execute(sql, args).await?);
                }
                Ok(merged)
            }
        }
    }

    /// Route a replica key to a concrete connection: the master when
    /// forced or slave-less, otherwise the slave picked by the resolution
    /// counter.
    async fn resolve_replica(
        &self,
        key: &str,
        option: &QueryOption,
    ) -> Result<Arc<dyn Connection>> {
        let config = ReplicaConfig::load(key, self.source.as_ref())?;
        let target = config.select(option.master, self.pool.sequence());
        self.pool.resolve(target).await
    }
}
