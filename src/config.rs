use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::parser::{Limits, MAX_BODY_BYTES, MAX_HEADER_BYTES};

/// Server configuration.
///
/// Every field has a default, so a YAML document only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub read_timeout_secs: u64,
    pub max_body_bytes: u64,
    pub max_header_bytes: usize,
    pub read_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            read_timeout_secs: 120,
            max_body_bytes: MAX_BODY_BYTES,
            max_header_bytes: MAX_HEADER_BYTES,
            read_buffer_size: 8192,
        }
    }
}

impl Config {
    /// Loads the YAML file named by `POCKET_CONFIG`, if set, then applies the
    /// `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("POCKET_CONFIG") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {path}"))?;
                Self::from_yaml(&text).with_context(|| format!("parsing config file {path}"))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_body_bytes: self.max_body_bytes,
            max_header_bytes: self.max_header_bytes,
        }
    }
}
