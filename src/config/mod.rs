// Configuration module entry point
// Loads config.yml once at startup and holds the frozen runtime state

mod state;
mod types;

use std::net::SocketAddr;
use std::path::Path;

// Re-export public types
pub use state::AppState;
pub use types::{Config, RouterMode, SiteConfig, DEFAULT_SKIN};

/// Default configuration file, relative to the working directory
pub const CONFIG_FILE: &str = "config.yml";

impl Config {
    /// Load configuration from a YAML file
    ///
    /// The file must exist. Keys may be overridden from the environment with
    /// the `ARCA_` prefix and `__` as the nesting separator
    /// (`ARCA_SERVER__PORT=9000`).
    pub fn load_from(config_path: &Path) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(config_path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            )
            .add_source(
                config::Environment::with_prefix("ARCA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8088)?
            .set_default("server.mode", "skin")?
            .set_default("server.strict_skin", false)?
            .set_default("server.keep_alive", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .build()?;

        let raw: types::RawConfig = settings.try_deserialize()?;
        Ok(raw.into())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
