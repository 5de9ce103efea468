//! Application configuration for semtab.
//!
//! User config lives at `~/.semtab/semtab.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SemtabError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "semtab.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".semtab";

// ---------------------------------------------------------------------------
// Config structs (matching semtab.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Defaults for extension requests.
    #[serde(default)]
    pub extension: ExtensionConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend root; `api/` is appended for service calls.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the bearer token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3003".into()
}
fn default_token_env() -> String {
    "SEMTAB_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[extension]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Decimal separator hints sent with every extension request.
    #[serde(default = "default_decimal_format")]
    pub decimal_format: Vec<String>,

    /// Weather parameters sent when the caller passes none.
    #[serde(default)]
    pub weather_params: Vec<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            decimal_format: default_decimal_format(),
            weather_params: Vec::new(),
        }
    }
}

fn default_decimal_format() -> Vec<String> {
    vec!["comma".into()]
}

// ---------------------------------------------------------------------------
// Service config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime transport configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Backend root URL.
    pub base_url: String,
    /// Bearer token, when one is available.
    pub token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl From<&AppConfig> for ServiceConfig {
    fn from(config: &AppConfig) -> Self {
        let token = std::env::var(&config.api.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        Self {
            base_url: config.api.base_url.clone(),
            token,
            timeout_secs: config.api.timeout_secs,
        }
    }
}

impl ServiceConfig {
    /// The `<base>/api/` root every service endpoint hangs off.
    pub fn api_root(&self) -> Result<Url> {
        let trimmed = self.base_url.trim_end_matches('/');
        Url::parse(&format!("{trimmed}/api/")).map_err(|e| {
            SemtabError::config(format!("invalid base_url '{}': {e}", self.base_url))
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.semtab/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SemtabError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.semtab/semtab.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SemtabError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SemtabError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SemtabError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SemtabError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SemtabError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the bearer token env var is set and non-empty.
pub fn validate_token(config: &AppConfig) -> Result<()> {
    let var_name = &config.api.token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(SemtabError::config(format!(
            "API token not found. Set the {var_name} environment variable."
        ))),
    }
}
