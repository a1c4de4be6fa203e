use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};
use zipview_base::error::ErrorKind;
use zipview_base::{FilePath, Pal, ResultExt, ZipviewError, ZipviewResult};

/// Name of the optional configuration file, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "zipview.toml";

/// Environment variable that overrides the listening port.
pub const PORT_ENV_VAR: &str = "PORT";

/// Server configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory the static files are served from.
    pub static_root: String,
    /// Settings for outbound proxy requests.
    pub proxy: ProxyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            static_root: "public".to_string(),
            proxy: ProxyConfig::default(),
        }
    }
}

/// Settings for the redirect-following fetch behind `/api/proxy`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    /// Per-hop timeout in seconds.
    pub timeout_secs: u64,
    /// Redirects followed before giving up.
    pub max_redirects: usize,
    /// Browser-like User-Agent sent upstream.
    pub user_agent: String,
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_redirects: 5,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

impl ServerConfig {
    /// Apply the value of the `PORT` variable, if set.
    pub fn with_port_override(mut self, port: Option<&str>) -> ZipviewResult<Self> {
        if let Some(port) = port {
            self.port = port.trim().parse().map_err(|_| {
                Box::new(ZipviewError::new(ErrorKind::Validation {
                    message: format!("Invalid {} value: {:?}", PORT_ENV_VAR, port),
                }))
            })?;
            debug!(port = self.port, "port overridden from environment");
        }
        Ok(self)
    }
}

/// Parse a configuration file's contents.
pub fn parse_config(contents: &str) -> ZipviewResult<ServerConfig> {
    toml::from_str(contents).map_err(|e| zipview_base::err!("Invalid configuration: {}", e))
}

/// Load the configuration from `path` if present, otherwise use the defaults.
pub fn load_config(pal: &dyn Pal, path: &FilePath) -> ZipviewResult<ServerConfig> {
    if !pal.file_exists(path)? {
        info!(path = %path, "no configuration file, using defaults");
        return Ok(ServerConfig::default());
    }
    let contents = pal.read_file_to_string(path)?;
    let config = parse_config(&contents).with_context(|| format!("loading {}", path))?;
    info!(path = %path, "loaded configuration");
    Ok(config)
}

/// Load the configuration file and apply the `PORT` environment variable.
pub fn load_config_from_environment(pal: &dyn Pal) -> ZipviewResult<ServerConfig> {
    let port = std::env::var(PORT_ENV_VAR).ok();
    load_config(pal, &FilePath::from(CONFIG_FILE_NAME))?.with_port_override(port.as_deref())
}
