//! Public SDK configuration wire types.
//!
//! `SdkConfig` is derived, never stored: it is rebuilt from the site,
//! its domains, and its settings on every cache miss, and served to
//! browsers by `GET /sdk/site-config`.

use serde::{Deserialize, Serialize};

use crate::domain;

/// Per-site consent policy governing whether tracking activates absent
/// an explicit consent signal on the host page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentDefault {
    #[default]
    OptIn,
    OptOut,
}

impl ConsentDefault {
    /// Parse a stored setting value. Unknown values fall back to the
    /// safe default rather than failing resolution.
    pub fn parse(value: &str) -> Self {
        match value {
            "opt_out" => Self::OptOut,
            _ => Self::OptIn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OptIn => "opt_in",
            Self::OptOut => "opt_out",
        }
    }
}

/// The resolved public configuration for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkConfig {
    /// The site key the tracking library initializes with.
    pub tracking_key: String,
    /// Outward-facing base URL of the ingest/API host.
    pub api_host: String,
    /// Lower-cased hosts of all registered domains. Primary and
    /// additional domains are not distinguished downstream.
    pub allowed_domains: Vec<String>,
    /// Whether session grouping is enabled for this site.
    pub grouping_enabled: bool,
    pub consent_default: ConsentDefault,
    /// Remaining per-site settings, passed through untyped.
    pub extra_options: serde_json::Map<String, serde_json::Value>,
}

impl SdkConfig {
    /// Whether a page hostname is covered by this config's allow-list.
    pub fn is_host_allowed(&self, page_host: &str) -> bool {
        domain::host_allowed(page_host, &self.allowed_domains)
    }
}
