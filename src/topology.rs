//! Topology model and validation
//!
//! A logical database target is declared as one of three topologies:
//! - `Single`: one node, the adapter key holds the driver config directly
//! - `Replica`: a primary (`master`) plus zero or more secondaries
//!   (`slaves`), each referenced by its own config key
//! - `Shard`: a list of replica keys (`members`) paired positionally with
//!   half-open numeric `ranges` that route identifiers to their owning
//!   member
//!
//! Composite configs reference sub-configs by key, so a shard member points
//! at a replica config whose master and slaves point at plain connection
//! configs. `validate` walks that graph once, at adapter construction, and
//! reports the first structural violation with the offending key.

use crate::config::ConfigSource;
use crate::error::{Result, RouteError};
use serde::Deserialize;

/// Declared shape of a logical database target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Single,
    Replica,
    Shard,
}

/// Replica config: a primary plus optional secondaries, all by key.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplicaConfig {
    pub master: String,
    #[serde(default)]
    pub slaves: Vec<String>,
}

impl ReplicaConfig {
    /// Read and structurally check the replica config stored at `key`.
    pub(crate) fn load(key: &str, source: &dyn ConfigSource) -> Result<Self> {
        let value = object_at(key, source)?;
        let config: ReplicaConfig = serde_json::from_value(value)
            .map_err(|e| RouteError::config(key, e.to_string()))?;
        if config.master.is_empty() {
            return Err(RouteError::config(
                key,
                "replica config requires a non-empty master",
            ));
        }
        Ok(config)
    }

    /// Key of the connection a query should use.
    ///
    /// The master when forced or when no slaves are declared, otherwise a
    /// slave picked by `seq` modulo the slave count. Feeding the adapter's
    /// sequence counter through here yields round-robin distribution over
    /// successive calls on one adapter instance; nothing is coordinated
    /// across instances or processes.
    pub fn select(&self, force_master: bool, seq: u64) -> &str {
        if force_master || self.slaves.is_empty() {
            &self.master
        } else {
            &self.slaves[(seq % self.slaves.len() as u64) as usize]
        }
    }
}

/// Half-open routing interval, paired positionally with a shard member.
///
/// A missing `from` is unbounded below, a missing `to` unbounded above.
/// The interval is inclusive at `from` and exclusive at `to`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ShardRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl ShardRange {
    pub fn contains(&self, id: i64) -> bool {
        if let Some(from) = self.from {
            if id < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if id >= to {
                return false;
            }
        }
        true
    }
}

/// Shard config: replica keys paired positionally with routing ranges.
#[derive(Debug, Clone, Deserialize)]
pub struct ShardConfig {
    pub members: Vec<String>,
    pub ranges: Vec<ShardRange>,
}

impl ShardConfig {
    /// Read and structurally check the shard config stored at `key`.
    pub(crate) fn load(key: &str, source: &dyn ConfigSource) -> Result<Self> {
        let value = object_at(key, source)?;
        let config: ShardConfig = serde_json::from_value(value)
            .map_err(|e| RouteError::config(key, e.to_string()))?;
        if config.members.len() != config.ranges.len() {
            return Err(RouteError::config(
                key,
                format!(
                    "shard config declares {} members but {} ranges",
                    config.members.len(),
                    config.ranges.len()
                ),
            ));
        }
        Ok(config)
    }

    /// Member key owning `id`: ranges are scanned in declared order and the
    /// first match wins. An identifier matching no range is an error, never
    /// a silent no-op.
    ///
    /// # Example
    ///
    /// ```
    /// use sqlroute::{ShardConfig, ShardRange};
    ///
    /// let config = ShardConfig {
    ///     members: vec!["r1".into(), "r2".into()],
    ///     ranges: vec![
    ///         ShardRange { from: None, to: Some(100) },
    ///         ShardRange { from: Some(100), to: None },
    ///     ],
    /// };
    ///
    /// assert_eq!(config.member_for(42).unwrap(), "r1");
    /// // The boundary belongs to the range that starts there.
    /// assert_eq!(config.member_for(100).unwrap(), "r2");
    /// ```
    pub fn member_for(&self, id: i64) -> Result<&str> {
        for (range, member) in self.ranges.iter().zip(&self.members) {
            if range.contains(id) {
                return Ok(member.as_str());
            }
        }
        Err(RouteError::ShardNotFound(id))
    }
}

/// Recursively check that `key` holds a structurally valid config for the
/// declared topology, following every referenced sub-key.
///
/// Runs once at adapter construction so malformed configuration surfaces
/// before any connection attempt.
pub fn validate(key: &str, topology: Topology, source: &dyn ConfigSource) -> Result<()> {
    match topology {
        Topology::Single => {
            object_at(key, source)?;
            Ok(())
        }
        Topology::Replica => {
            let config = ReplicaConfig::load(key, source)?;
            validate(&config.master, Topology::Single, source)?;
            for slave in &config.slaves {
                validate(slave, Topology::Single, source)?;
            }
            Ok(())
        }
        Topology::Shard => {
            let config = ShardConfig::load(key, source)?;
            for member in &config.members {
                validate(member, Topology::Replica, source)?;
            }
            Ok(())
        }
    }
}

fn object_at(key: &str, source: &dyn ConfigSource) -> Result<serde_json::Value> {
    let value = source
        .get(key)
        .ok_or_else(|| RouteError::config(key, "no configuration found"))?;
    if !value.is_object() {
        return Err(RouteError::config(key, "config must be an object"));
    }
    Ok(value)
}
