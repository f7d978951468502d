use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteError {
    /// Configuration key missing or structurally invalid. Raised while
    /// validating a topology at construction, or when a config re-read
    /// fails at query time.
    #[error("Invalid config for key '{key}': {reason}")]
    Config { key: String, reason: String },

    /// Topology misuse detected before any connection is touched, such as
    /// a missing `shard_of` option on a shard adapter.
    #[error("Topology error: {0}")]
    Topology(String),

    /// The identifier matched none of the declared shard ranges.
    #[error("Shard not found for id {0}")]
    ShardNotFound(i64),

    /// Driver-level transport or authentication failure, propagated
    /// unchanged. Fatal-ness is signalled separately through the driver's
    /// event sink and evicts the pooled connection as a side effect.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution failure, propagated unchanged.
    #[error("Query error: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RouteError {
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        RouteError::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn topology(message: impl Into<String>) -> Self {
        RouteError::Topology(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        RouteError::Connection(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        RouteError::Query(message.into())
    }
}

pub type Result<T> = std::result::Result<T, RouteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_key() {
        let err = RouteError::config("db-main", "expected an object");
        assert!(err.to_string().contains("db-main"));
        assert!(err.to_string().contains("expected an object"));
    }

    #[test]
    fn test_shard_not_found_display() {
        let err = RouteError::ShardNotFound(42);
        assert_eq!(err.to_string(), "Shard not found for id 42");
    }
}
