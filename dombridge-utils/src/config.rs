//! Typed access to host settings.
//!
//! Settings live in a TOML table and are addressed by dotted keys such as
//! `dispatch.log_bindings`. A requested setting is a [`Setting`] that reads
//! the table on first access and keeps the value from then on.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use thiserror::Error;
use toml::{Table, Value};
use tracing::{info, warn};

/// Errors raised while loading a settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Source of typed settings.
///
/// A missing key, or a value of another type, yields `default`.
pub trait Configuration: Send + Sync {
    fn get_bool(&self, key: &str, default: bool) -> Setting<bool>;

    fn get_int(&self, key: &str, default: i64) -> Setting<i64>;
}

/// A setting value evaluated on first access.
pub struct Setting<T> {
    value: OnceLock<T>,
    resolve: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: Copy> Setting<T> {
    /// A setting that is already known.
    pub fn fixed(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            value: OnceLock::from(value),
            resolve: Box::new(move || value),
        }
    }

    /// The value, read from the source the first time this is called.
    pub fn get(&self) -> T {
        *self.value.get_or_init(|| (self.resolve)())
    }

    pub fn is_evaluated(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for Setting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.get() {
            Some(value) => f.debug_tuple("Setting").field(value).finish(),
            None => f.write_str("Setting(<unevaluated>)"),
        }
    }
}

/// Conversion from a raw TOML value to a setting type.
trait SettingType: Copy + Send + Sync + 'static {
    const NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl SettingType for bool {
    const NAME: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl SettingType for i64 {
    const NAME: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer()
    }
}

type SharedTable = Arc<RwLock<Table>>;

/// Walks `key` segment by segment through nested tables.
fn lookup(table: &Table, key: &str) -> Option<Value> {
    let mut segments = key.split('.');
    let mut current = table.get(segments.next()?)?;
    for segment in segments {
        current = current.as_table()?.get(segment)?;
    }
    Some(current.clone())
}

fn setting<T: SettingType>(table: &SharedTable, key: &str, default: T) -> Setting<T> {
    let table = Arc::clone(table);
    let key = key.to_string();
    Setting {
        value: OnceLock::new(),
        resolve: Box::new(move || {
            let table = table.read().unwrap_or_else(PoisonError::into_inner);
            match lookup(&table, &key) {
                None => default,
                Some(value) => T::from_value(&value).unwrap_or_else(|| {
                    warn!(
                        key = %key,
                        expected = T::NAME,
                        found = value.type_str(),
                        "Setting has the wrong type, using default"
                    );
                    default
                }),
            }
        }),
    }
}

/// Settings parsed from a TOML file.
#[derive(Debug, Clone, Default)]
pub struct TomlConfiguration {
    table: SharedTable,
    source: Option<PathBuf>,
}

impl TomlConfiguration {
    /// Loads settings from `path`. A missing file yields empty settings.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No settings file found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&contents).inspect_err(|e| {
            warn!("Failed to parse settings file {:?}: {}", path, e);
        })?;
        config.source = Some(path.to_path_buf());
        info!("Loaded settings from {:?}", path);
        Ok(config)
    }

    /// Parses settings from TOML text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let table: Table = toml::from_str(contents)?;
        Ok(Self::from_table(table))
    }

    pub fn from_table(table: Table) -> Self {
        Self {
            table: Arc::new(RwLock::new(table)),
            source: None,
        }
    }

    /// The file the settings were read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl Configuration for TomlConfiguration {
    fn get_bool(&self, key: &str, default: bool) -> Setting<bool> {
        setting(&self.table, key, default)
    }

    fn get_int(&self, key: &str, default: i64) -> Setting<i64> {
        setting(&self.table, key, default)
    }
}

/// Settings held in memory, for tests and embedded hosts.
///
/// Values may change after a [`Setting`] was requested; the setting sees
/// whatever is stored when it is first read.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfiguration {
    table: SharedTable,
}

impl InMemoryConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`InMemoryConfiguration::set`].
    pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Stores `value` under `key`, creating intermediate tables for dotted keys.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let mut segments: Vec<&str> = key.split('.').collect();
        let Some(last) = segments.pop() else {
            return;
        };
        let mut current = &mut *table;
        for segment in segments {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            let Value::Table(next) = entry else {
                return;
            };
            current = next;
        }
        current.insert(last.to_string(), value.into());
    }
}

impl Configuration for InMemoryConfiguration {
    fn get_bool(&self, key: &str, default: bool) -> Setting<bool> {
        setting(&self.table, key, default)
    }

    fn get_int(&self, key: &str, default: i64) -> Setting<i64> {
        setting(&self.table, key, default)
    }
}
