//! Configuration sources
//!
//! The router is format-agnostic about configuration: it only needs a
//! key to raw-value mapping. This module provides:
//! - `ConfigSource`: the abstract key lookup boundary
//! - `MemoryConfigSource`: an in-process map, useful for tests and embedding
//! - `ConfigStore`: a reloadable directory loader merging `.json` and
//!   `.toml` files
//!
//! Config files share one shape regardless of format:
//!
//! ```json
//! { "configs": [ { "key": "db-main", "value": { "host": "10.0.0.1" } } ] }
//! ```

use crate::error::{Result, RouteError};
use serde::Deserialize;
use serde_json::Value as ConfigValue;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// Abstract key to config-value mapping consumed by the router.
///
/// Implementations are read-only from the router's perspective and may be
/// shared across many adapters.
pub trait ConfigSource: Send + Sync {
    /// Raw config value for `key`, if any.
    fn get(&self, key: &str) -> Option<ConfigValue>;
}

/// In-process config source backed by a plain map.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigSource {
    entries: HashMap<String, ConfigValue>,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.entries.insert(key.into(), value);
    }
}

impl FromIterator<(String, ConfigValue)> for MemoryConfigSource {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl ConfigSource for MemoryConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.entries.get(key).cloned()
    }
}

/// Expected shape of a config file.
#[derive(Deserialize)]
struct ConfigFile {
    configs: Vec<ConfigEntry>,
}

#[derive(Deserialize)]
struct ConfigEntry {
    key: String,
    value: ConfigValue,
}

/// Reloadable config source merging every `.json` and `.toml` file found
/// in one directory.
///
/// Files are merged in file-name order, so a key declared in two files
/// resolves to the one from the later file. `reload` replaces the store
/// contents wholesale; a failed reload leaves the previous entries intact.
pub struct ConfigStore {
    directory: PathBuf,
    entries: RwLock<HashMap<String, ConfigValue>>,
}

impl ConfigStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Scan the directory and replace the store contents with the merged
    /// entries of every config file found.
    pub fn reload(&self) -> Result<()> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.directory)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    extension_of(path).as_deref(),
                    Some("json") | Some("toml")
                )
            })
            .collect();
        paths.sort();

        let mut merged = HashMap::new();
        for path in &paths {
            let file = Self::load_file(path)?;
            debug!(path = %path.display(), entries = file.configs.len(), "loaded config file");
            for entry in file.configs {
                merged.insert(entry.key, entry.value);
            }
        }

        *self.entries.write().expect("config store lock poisoned") = merged;
        Ok(())
    }

    /// Number of entries currently loaded.
    pub fn len(&self) -> usize {
        self.entries.read().expect("config store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load_file(path: &Path) -> Result<ConfigFile> {
        let content = fs::read_to_string(path)?;
        let parsed = match extension_of(path).as_deref() {
            Some("json") => serde_json::from_str::<ConfigFile>(&content)
                .map_err(|e| RouteError::config(path.display().to_string(), e.to_string())),
            Some("toml") => toml::from_str::<ConfigFile>(&content)
                .map_err(|e| RouteError::config(path.display().to_string(), e.to_string())),
            _ => Err(RouteError::config(
                path.display().to_string(),
                "unsupported config file extension",
            )),
        }?;
        for entry in &parsed.configs {
            if entry.key.is_empty() {
                return Err(RouteError::config(
                    path.display().to_string(),
                    "config entry with an empty key",
                ));
            }
        }
        Ok(parsed)
    }
}

impl ConfigSource for ConfigStore {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.entries
            .read()
            .expect("config store lock poisoned")
            .get(key)
            .cloned()
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
