//! Site provisioning and management.
//!
//! All operations are scoped to the authenticated account. Another
//! account's site reads as 404, never 403.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use porchlight_core::normalize_fqdn;

use crate::error::ApiError;
use crate::sessions::AuthenticatedAccount;
use crate::state::AppState;
use crate::store::sites::{STATUS_ACTIVE, STATUS_INACTIVE};
use crate::store::{AddDomainOutcome, Domain, Site, SiteDetail};

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub name: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSiteResponse {
    pub id: String,
    pub site_key: String,
    pub loader_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSiteRequest {
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddDomainRequest {
    pub host: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetSettingRequest {
    pub value: Option<String>,
}

/// POST /sites
pub async fn create_site(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Json(req): Json<CreateSiteRequest>,
) -> Result<Json<CreateSiteResponse>, ApiError> {
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(ApiError::InvalidBody("missing name"))?;
    let domain = req
        .domain
        .as_deref()
        .ok_or(ApiError::InvalidBody("missing domain"))?;
    let host = normalize_fqdn(domain).map_err(|e| ApiError::InvalidDomain(e.to_string()))?;

    let site = state.store.create_site(&auth.account_id, name, &host)?;
    tracing::info!(site_id = %site.id, host = %host, "Site provisioned");

    Ok(Json(CreateSiteResponse {
        loader_url: state.loader_url(&site.site_key),
        id: site.id,
        site_key: site.site_key,
    }))
}

/// GET /sites
pub async fn list_sites(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
) -> Result<Json<Vec<Site>>, ApiError> {
    Ok(Json(state.store.list_sites(&auth.account_id)?))
}

/// GET /sites/{id}
pub async fn get_site(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path(id): Path<String>,
) -> Result<Json<SiteDetail>, ApiError> {
    let detail = state
        .store
        .get_site(&auth.account_id, &id)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(detail))
}

/// PATCH /sites/{id}
pub async fn update_site(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path(id): Path<String>,
    Json(req): Json<UpdateSiteRequest>,
) -> Result<Json<Site>, ApiError> {
    if let Some(status) = req.status.as_deref() {
        if status != STATUS_ACTIVE && status != STATUS_INACTIVE {
            return Err(ApiError::InvalidBody("unknown status"));
        }
    }
    let name = req.name.as_deref().map(str::trim);
    if name.is_some_and(str::is_empty) {
        return Err(ApiError::InvalidBody("empty name"));
    }

    let site = state
        .store
        .update_site(&auth.account_id, &id, name, req.status.as_deref())?
        .ok_or(ApiError::NotFound)?;

    // Deactivation must not keep serving from a warm cache entry
    // longer than necessary.
    if req.status.is_some() {
        state.cache.clear();
    }

    Ok(Json(site))
}

/// POST /sites/{id}/domains
pub async fn add_domain(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path(id): Path<String>,
    Json(req): Json<AddDomainRequest>,
) -> Result<Json<Domain>, ApiError> {
    let host = req
        .host
        .as_deref()
        .ok_or(ApiError::InvalidBody("missing host"))?;
    let host = normalize_fqdn(host).map_err(|e| ApiError::InvalidDomain(e.to_string()))?;

    let domain = match state.store.add_domain(&auth.account_id, &id, &host)? {
        AddDomainOutcome::Added(domain) => domain,
        AddDomainOutcome::SiteNotFound => return Err(ApiError::NotFound),
        AddDomainOutcome::DuplicateHost => return Err(ApiError::DomainTaken),
    };

    tracing::info!(site_id = %id, host = %host, "Domain added");
    Ok(Json(domain))
}

/// PUT /sites/{id}/settings/{key}
pub async fn set_setting(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path((id, key)): Path<(String, String)>,
    Json(req): Json<SetSettingRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let value = req
        .value
        .as_deref()
        .ok_or(ApiError::InvalidBody("missing value"))?;

    let found = state.store.set_setting(&auth.account_id, &id, &key, value)?;
    if !found {
        return Err(ApiError::NotFound);
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}
