// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Skin used when `config.yml` does not name one
pub const DEFAULT_SKIN: &str = "default";

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub site: SiteConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Site identity exposed to the front end as `window.__WIKI_CONFIG__`
///
/// Field order is the JSON key order of the runtime script.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub wiki_name: String,
    pub bbs_name: String,
    pub skin: String,
}

impl SiteConfig {
    /// Build a fully defaulted site config from raw, possibly empty fields
    ///
    /// An absent or empty `bbs_name` falls back to `wiki_name`, an absent or
    /// empty `skin` falls back to [`DEFAULT_SKIN`].
    pub fn resolve(wiki_name: Option<String>, bbs_name: Option<String>, skin: Option<String>) -> Self {
        let wiki_name = wiki_name.unwrap_or_default();
        let bbs_name = bbs_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| wiki_name.clone());
        let skin = skin
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_SKIN.to_string());

        Self {
            wiki_name,
            bbs_name,
            skin,
        }
    }
}

/// Shape of `config.yml` as parsed, before defaulting
#[derive(Debug, Deserialize)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub wiki_name: Option<String>,
    #[serde(default)]
    pub bbs_name: Option<String>,
    #[serde(default)]
    pub skin: Option<String>,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            site: SiteConfig::resolve(raw.wiki_name, raw.bbs_name, raw.skin),
            server: raw.server,
            logging: raw.logging,
        }
    }
}

/// Request routing policy
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouterMode {
    /// Skin-aware shell with `/config.js`, `/assets/` and `/skin-assets/`
    Skin,
    /// Bundle files served as-is, unknown paths fall back to `index.html`
    Spa,
    /// Same as `Spa` plus the `/config.js` route
    SpaConfig,
}

impl RouterMode {
    /// Whether this mode renders the skin layout (and so needs the manifest)
    pub const fn uses_skin(self) -> bool {
        matches!(self, Self::Skin)
    }

    /// Whether this mode answers `/config.js`
    pub const fn serves_config_script(self) -> bool {
        matches!(self, Self::Skin | Self::SpaConfig)
    }
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Build output directory read at startup instead of the embedded bundle
    #[serde(default)]
    pub dist_dir: Option<String>,
    pub mode: RouterMode,
    /// Refuse to start when the configured skin directory is missing
    pub strict_skin: bool,
    pub keep_alive: bool,
    pub max_connections: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}
