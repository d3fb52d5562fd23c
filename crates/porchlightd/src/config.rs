//! Configuration for the porchlightd daemon

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Fallback session secret for local development only. An instance
/// running with `environment = "production"` refuses to start without
/// an explicit secret.
const DEV_SESSION_SECRET: &str = "porchlight-dev-secret-do-not-deploy";

fn expand_env_refs(value: &str) -> anyhow::Result<String> {
    let mut out = String::new();
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| anyhow::anyhow!("Unclosed env var reference in value: {}", value))?;
        let name = &after[..end];
        if name.is_empty() {
            return Err(anyhow::anyhow!(
                "Empty env var reference in value: {}",
                value
            ));
        }
        let resolved = std::env::var(name)
            .map_err(|_| anyhow::anyhow!("Missing environment variable: {}", name))?;
        out.push_str(&resolved);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Resolve a secret value: `${VAR}` references are expanded, and a
/// `file:` (or `@`) prefix reads the secret from a file.
fn expand_secret_ref(value: &str) -> anyhow::Result<String> {
    let expanded = expand_env_refs(value)?;
    let expanded = expanded.trim().to_string();

    let path = if let Some(rest) = expanded.strip_prefix("file:") {
        rest.trim()
    } else if let Some(rest) = expanded.strip_prefix('@') {
        rest.trim()
    } else {
        return Ok(expanded);
    };

    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read secret file {}: {e}", path))?;
    let s = String::from_utf8(bytes)
        .map_err(|e| anyhow::anyhow!("Secret file {} is not valid UTF-8: {e}", path))?;
    Ok(s.trim().to_string())
}

/// Deployment environment. Anything other than `development` enforces
/// the production startup invariants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Daemon configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Listen address (e.g., "127.0.0.1:8273")
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path to the SQLite database
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Outward-facing base URL, used for loader URLs and the SDK
    /// config's apiHost (e.g., "https://app.porchlight.io")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub environment: Environment,

    /// Session signing secret. Supports `${VAR}` and `file:` refs.
    #[serde(default)]
    pub session_secret: String,

    /// Session lifetime in seconds (default 7 days)
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// SDK config cache TTL in seconds
    #[serde(default = "default_config_cache_ttl_secs")]
    pub config_cache_ttl_secs: u64,

    /// SDK config cache entry cap (0 disables the cache)
    #[serde(default = "default_config_cache_max_entries")]
    pub config_cache_max_entries: usize,

    /// Enable CORS for browser access. The loader fetches the SDK
    /// config from arbitrary origins, so this defaults on.
    #[serde(default = "default_cors")]
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen() -> String {
    "127.0.0.1:8273".to_string()
}

fn default_database() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("porchlight")
        .join("porchlight.db")
}

fn default_base_url() -> String {
    "http://127.0.0.1:8273".to_string()
}

fn default_session_ttl_secs() -> u64 {
    7 * 24 * 3600
}

fn default_config_cache_ttl_secs() -> u64 {
    60
}

fn default_config_cache_max_entries() -> usize {
    4096
}

fn default_cors() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            database: default_database(),
            base_url: default_base_url(),
            environment: Environment::default(),
            session_secret: String::new(),
            session_ttl_secs: default_session_ttl_secs(),
            config_cache_ttl_secs: default_config_cache_ttl_secs(),
            config_cache_max_entries: default_config_cache_max_entries(),
            cors_enabled: default_cors(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;

        // Support both YAML and TOML based on extension
        let mut config: Config = if path
            .as_ref()
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            serde_yaml::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };

        config.expand_refs()?;
        Ok(config)
    }

    pub fn load_default() -> anyhow::Result<Self> {
        // Try standard config locations
        let paths = [
            PathBuf::from("/etc/porchlight/config.yaml"),
            PathBuf::from("/etc/porchlight/config.toml"),
            dirs::config_dir()
                .map(|d| d.join("porchlight/config.yaml"))
                .unwrap_or_default(),
            dirs::config_dir()
                .map(|d| d.join("porchlight/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("./porchlightd.yaml"),
            PathBuf::from("./porchlightd.toml"),
        ];

        let mut errors: Vec<(PathBuf, anyhow::Error)> = Vec::new();
        for path in paths {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => {
                        if let Err(err) = config.validate() {
                            errors.push((path, err));
                        } else {
                            tracing::info!(path = %path.display(), "Loaded config");
                            return Ok(config);
                        }
                    }
                    Err(err) => {
                        errors.push((path, err));
                    }
                }
            }
        }

        if !errors.is_empty() {
            let mut msg = String::from("Failed to load porchlightd config from existing file(s):\n");
            for (path, err) in errors {
                msg.push_str(&format!("  - {}: {err}\n", path.display()));
            }
            return Err(anyhow::anyhow!(msg));
        }

        Ok(Self::default())
    }

    pub fn expand_refs(&mut self) -> anyhow::Result<()> {
        if !self.session_secret.is_empty() {
            self.session_secret = expand_secret_ref(&self.session_secret)?;
        }
        self.base_url = expand_env_refs(&self.base_url)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.listen
            .parse::<std::net::SocketAddr>()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {:?}: {e}", self.listen))?;

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "base_url must be an absolute http(s) URL, got {:?}",
                self.base_url
            ));
        }

        // A missing signing secret in production is fatal, never a
        // silent fallback.
        if self.environment == Environment::Production && self.session_secret.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "session_secret is required when environment = \"production\""
            ));
        }

        Ok(())
    }

    /// The signing secret to run with. Only development instances fall
    /// back to the fixed dev secret, and loudly.
    pub fn resolved_session_secret(&self) -> anyhow::Result<String> {
        let secret = self.session_secret.trim();
        if !secret.is_empty() {
            return Ok(secret.to_string());
        }

        if self.environment == Environment::Production {
            return Err(anyhow::anyhow!(
                "session_secret is required when environment = \"production\""
            ));
        }

        tracing::warn!(
            "No session_secret configured; using the built-in development secret. \
             Sessions will not survive scrutiny; never deploy this configuration."
        );
        Ok(DEV_SESSION_SECRET.to_string())
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn tracing_level(&self) -> tracing::Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }
}
