//! Shared application state for the daemon

use std::sync::Arc;
use std::time::Duration;

use porchlight_core::SessionSigner;

use crate::cache::SdkConfigCache;
use crate::config::Config;
use crate::resolver::ConfigResolver;
use crate::store::Store;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    /// Read-only after startup.
    pub signer: Arc<SessionSigner>,
    pub resolver: ConfigResolver,
    pub cache: SdkConfigCache,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let secret = config.resolved_session_secret()?;
        let signer = Arc::new(SessionSigner::new(
            secret.as_bytes(),
            Duration::from_secs(config.session_ttl_secs),
        ));

        let store = Arc::new(Store::new(&config.database)?);
        tracing::info!(database = %config.database.display(), "Opened database");

        let resolver = ConfigResolver::new(store.clone(), config.base_url.clone());
        let cache = SdkConfigCache::new(
            Duration::from_secs(config.config_cache_ttl_secs),
            config.config_cache_max_entries,
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            signer,
            resolver,
            cache,
            started_at: chrono::Utc::now(),
        })
    }

    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }

    /// The loader URL a page embeds for a given site key.
    pub fn loader_url(&self, site_key: &str) -> String {
        format!(
            "{}/sdk/loader?site={}",
            self.config.base_url.trim_end_matches('/'),
            site_key
        )
    }
}
