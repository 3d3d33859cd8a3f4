// src/config.rs
//! Runtime configuration.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. `config/cold-chain.{toml,json,yaml}` (optional)
//! 3. Environment variables prefixed `COLD_CHAIN`, with `__` separating
//!    nested keys (e.g. `COLD_CHAIN__SERVER__PORT=8080`)
//!
//! The binary loads a `.env` file before reading the environment.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "config/cold-chain";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,

    /// Default `env_logger` filter; `RUST_LOG` still takes precedence
    pub log_level: String,

    /// Where the ledger is restored from at startup and saved on shutdown.
    /// Without it the ledger lives in memory only.
    pub snapshot_path: Option<PathBuf>,
}

impl Settings {
    /// Loads settings from the default config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Loads settings using `file` (extension optional) as the config file.
    /// A missing file is not an error.
    pub fn load_from(file: &Path) -> Result<Self, ConfigError> {
        let name = file.to_string_lossy();
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("log_level", "info")?
            .add_source(File::with_name(&name).required(false))
            .add_source(Environment::with_prefix("COLD_CHAIN").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Socket address the API server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigError::Message(format!("invalid server address: {}", e)))
    }
}
