//! Builds the public SDK configuration from persisted site state.
//!
//! Resolution is a pure read of current state (no writes, safe to
//! repeat), which is what makes the TTL cache in front of it correct.
//! Absent and inactive sites both resolve to `None`: the site-config
//! endpoint must not disclose that a key exists but is switched off.

use std::sync::Arc;

use porchlight_core::sdk::{ConsentDefault, SdkConfig};

use crate::store::{self, Store};

#[derive(Clone)]
pub struct ConfigResolver {
    store: Arc<Store>,
    api_host: String,
}

impl ConfigResolver {
    pub fn new(store: Arc<Store>, api_host: String) -> Self {
        Self { store, api_host }
    }

    pub fn resolve(&self, site_key: &str) -> store::Result<Option<SdkConfig>> {
        let Some(site) = self.store.find_active_by_key(site_key)? else {
            return Ok(None);
        };

        let allowed_domains = self
            .store
            .domains_for_site(&site.id)?
            .into_iter()
            .map(|d| d.host.to_ascii_lowercase())
            .collect();

        let mut settings = self.store.settings_for_site(&site.id)?;

        let consent_default = settings
            .remove("consent_default")
            .map(|v| ConsentDefault::parse(&v))
            .unwrap_or_default();

        let grouping_enabled = settings
            .remove("grouping_enabled")
            .map(|v| v != "false")
            .unwrap_or(true);

        let extra_options = settings
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();

        Ok(Some(SdkConfig {
            tracking_key: site.site_key,
            api_host: self.api_host.clone(),
            allowed_domains,
            grouping_enabled,
            consent_default,
            extra_options,
        }))
    }
}
