//! The public SDK surface: the site-config endpoint and the loader.

use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use porchlight_core::sdk::SdkConfig;
use porchlight_core::{LOADER_CACHE_CONTROL, LOADER_CONTENT_TYPE, LOADER_JS};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SiteConfigQuery {
    pub site: Option<String>,
}

/// GET /sdk/site-config?site=<key>
///
/// Cached per site key with a short TTL. Unknown and inactive sites
/// are one and the same 404.
pub async fn site_config(
    State(state): State<AppState>,
    Query(query): Query<SiteConfigQuery>,
) -> Result<Json<SdkConfig>, ApiError> {
    let site_key = query
        .site
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::MissingSiteParam)?;

    let config = state
        .cache
        .fetch_with(site_key, || state.resolver.resolve(site_key))
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json((*config).clone()))
}

/// GET /sdk/loader
///
/// The same bytes for every site; parameterized only by the query
/// string the embedding page supplies, read in the browser.
pub async fn loader() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, LOADER_CONTENT_TYPE),
            (CACHE_CONTROL, LOADER_CACHE_CONTROL),
        ],
        LOADER_JS,
    )
}
