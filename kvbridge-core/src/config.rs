//! Client configuration, loaded from JSON.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::logger::LogLevel;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
}

impl Default for NodeAddress {
    fn default() -> Self {
        NodeAddress {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Nodes to try in order; the first that accepts a connection is used.
    pub addresses: Vec<NodeAddress>,
    /// Socket read/write timeout. 0 disables it.
    pub request_timeout_ms: u64,
    pub database_id: i64,
    pub client_name: Option<String>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addresses: vec![NodeAddress::default()],
            request_timeout_ms: 250,
            database_id: 0,
            client_name: None,
            log_level: "warn".to_string(),
            log_file: None,
        }
    }
}

impl ClientConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<ClientConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Read config file {}", path.display()))?;
        let config: ClientConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.addresses.is_empty() {
            bail!("at least one address is required");
        }
        for address in &self.addresses {
            if address.host.is_empty() {
                bail!("address with an empty host");
            }
            if address.port == 0 {
                bail!("invalid port 0 for {}", address.host);
            }
        }
        if self.database_id < 0 {
            bail!("database id {} is negative", self.database_id);
        }
        self.level()?;
        Ok(())
    }

    pub fn level(&self) -> anyhow::Result<LogLevel> {
        self.log_level
            .parse::<LogLevel>()
            .context("Invalid log_level")
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}
