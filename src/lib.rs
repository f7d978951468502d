//! # sqlroute
//!
//! Topology-aware relational connection routing: a logical configuration
//! key resolves to one or more physical database connections according to
//! its declared topology (single node, primary/replica set, or
//! range-sharded cluster of replica sets), queries execute against the
//! resolved connection(s), and per-connection results merge into one
//! logical result.
//!
//! The database driver is a caller-supplied capability behind the
//! [`driver::Driver`] trait; this crate handles validation, routing,
//! pooling and aggregation on top of it.
//!
//! ```ignore
//! use sqlroute::{Context, MemoryConfigSource, QueryOption};
//!
//! let context = Context::new(source, driver);
//! let users = context.shard("users")?;
//! let result = users
//!     .query("SELECT * FROM users WHERE id = ?", &[42.into()],
//!            &QueryOption::new().with_shard(42))
//!     .await?;
//! ```

pub mod adapter;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod pool;
pub mod topology;
pub mod types;

pub use adapter::SqlAdapter;
pub use config::{ConfigSource, ConfigStore, MemoryConfigSource};
pub use context::Context;
pub use driver::{Connection, Driver, EventSink, EvictReason};
pub use error::{Result, RouteError};
pub use pool::ConnectionPool;
pub use topology::{ReplicaConfig, ShardConfig, ShardRange, Topology};
pub use types::{ExecResult, QueryOption, QueryResult, Row, ShardTarget, Value};
