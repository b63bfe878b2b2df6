//! Utilities shared by dombridge hosts.
//!
//! - [`config`]: typed boolean and integer settings read from TOML, evaluated
//!   on first access
//! - [`script_position`]: line/column arithmetic and human-readable position
//!   reports for diagnostics on script text

pub mod config;
pub mod script_position;

pub use config::{ConfigError, Configuration, InMemoryConfiguration, Setting, TomlConfiguration};
