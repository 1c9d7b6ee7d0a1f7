//! YAML configuration loading and defaulting.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_rules() -> Vec<String> {
    vec!["match,allow".to_string()]
}

fn default_dns() -> String {
    "https://1.1.1.1/dns-query".to_string()
}

fn default_country_db() -> PathBuf {
    PathBuf::from("GeoLite2-Country.mmdb")
}

/// Gateway configuration. Every field has a default, so an empty file is a
/// valid configuration (allow everything, local listener).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Listen address, `host:port`
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Ordered rule specifications; position is priority
    #[serde(default = "default_rules")]
    pub rules: Vec<String>,

    /// GeoIP database paths
    #[serde(default)]
    pub mmdb: Mmdb,

    /// DNS upstream: `host`, `host:port`, or an `https://` DoH endpoint
    #[serde(default = "default_dns")]
    pub dns: String,
}

/// GeoIP database file locations.
#[derive(Debug, Clone, Deserialize)]
pub struct Mmdb {
    /// Country-level database used by geoip rules
    #[serde(default = "default_country_db")]
    pub country: PathBuf,
}

impl Default for Mmdb {
    fn default() -> Self {
        Self {
            country: default_country_db(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file, applying defaults for any
    /// absent field.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }
}
