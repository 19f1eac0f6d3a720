//! Server configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no
//! file at all) yields a working local server.

use std::path::Path;

use retro_core::Redaction;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Whose name a delete request is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteAuth {
    /// The `authorName` the client put in the request
    #[default]
    Payload,
    /// The name the connection joined with
    Session,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Connections beyond this are closed right after accept
    pub max_connections: usize,
    /// Per-connection outbound queue depth; a full queue evicts the viewer
    pub outbound_queue: usize,
    /// Seconds between stats log lines, 0 disables
    pub stats_interval_secs: u64,
    pub redaction: Redaction,
    pub delete_auth: DeleteAuth,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            max_connections: 256,
            outbound_queue: 64,
            stats_interval_secs: 60,
            redaction: Redaction::default(),
            delete_auth: DeleteAuth::default(),
        }
    }
}

impl ServerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.outbound_queue == 0 {
            return Err(Error::Config("outbound_queue must be at least 1".into()));
        }
        if self.max_connections == 0 {
            return Err(Error::Config("max_connections must be at least 1".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
