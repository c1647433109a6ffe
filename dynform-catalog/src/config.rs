//! Catalog configuration loaded with Figment.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. An optional configuration file (TOML, YAML or JSON, by extension)
//! 3. `DYNFORM_` prefixed environment variables, e.g. `DYNFORM_BASE_URL`

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Environment variable prefix for catalog settings.
pub const ENV_PREFIX: &str = "DYNFORM_";

/// Settings for talking to the plugin catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Service root; paths like `/dynamic/plugins` are appended to it.
    pub base_url: String,
    /// Page size used by the page controller.
    pub page_size: u32,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            page_size: 10,
            timeout_secs: 30,
            user_agent: format!("dynform/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CatalogConfig {
    /// Load defaults overridden by the environment.
    pub fn load() -> Result<Self> {
        Ok(Self::figment(None).extract()?)
    }

    /// Load defaults, then `path`, then the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self::figment(Some(path)).extract()?)
    }

    fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(CatalogConfig::default()));

        if let Some(path) = file {
            debug!(path = %path.display(), "loading catalog config file");
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Yaml::file(path)),
            };
        }

        figment.merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
