//! Registration, login, logout, and session introspection.

use axum::extract::State;
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use porchlight_core::{hash_password, verify_password};

use crate::error::ApiError;
use crate::sessions::{self, AuthenticatedAccount};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
}

/// One canonical spelling per address: trimmed, lower-cased.
fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, host)| !local.is_empty() && host.contains('.'));
    if !well_formed {
        return Err(ApiError::InvalidBody("malformed email"));
    }
    Ok(email)
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = req.email.as_deref().ok_or(ApiError::InvalidBody("missing email"))?;
    let password = req
        .password
        .as_deref()
        .ok_or(ApiError::InvalidBody("missing password"))?;

    let email = normalize_email(email)?;
    let password_hash = hash_password(password).map_err(|e| match e {
        porchlight_core::Error::PasswordLength { .. } => {
            ApiError::InvalidBody("password length out of range")
        }
        other => {
            tracing::error!(error = %other, "Password hashing failed");
            ApiError::RegisterFailed
        }
    })?;

    let created = state
        .store
        .create_account(&email, req.name.as_deref(), &password_hash)
        .map_err(|e| {
            tracing::error!(error = %e, "Account insert failed");
            ApiError::RegisterFailed
        })?;

    match created {
        Some(account) => {
            tracing::info!(account_id = %account.id, "Account registered");
            Ok(Json(serde_json::json!({ "ok": true })))
        }
        None => Err(ApiError::EmailTaken),
    }
}

/// POST /auth/login
///
/// Unknown email and wrong password are indistinguishable to the
/// caller.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.as_deref().ok_or(ApiError::InvalidBody("missing email"))?;
    let password = req
        .password
        .as_deref()
        .ok_or(ApiError::InvalidBody("missing password"))?;
    let email = normalize_email(email)?;

    let account = state
        .store
        .find_account_by_email(&email)?
        .filter(|account| verify_password(password, &account.password_hash))
        .ok_or(ApiError::InvalidCredentials)?;

    state.store.touch_last_login(&account.id)?;

    let token = state
        .signer
        .sign(&account.id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let cookie = sessions::build_session_cookie(
        &token,
        state.config.session_ttl_secs,
        !state.config.is_development(),
    );

    tracing::info!(account_id = %account.id, "Login");
    Ok((
        [(SET_COOKIE, cookie)],
        Json(serde_json::json!({ "ok": true })),
    ))
}

/// POST /auth/logout. Clears the cookie; the token itself simply
/// ages out, there is no server-side revocation.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = sessions::clear_session_cookie(!state.config.is_development());
    (
        StatusCode::SEE_OTHER,
        [(LOCATION, "/".to_string()), (SET_COOKIE, cookie)],
    )
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
) -> Result<Json<MeResponse>, ApiError> {
    let account = state
        .store
        .find_account(&auth.account_id)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(MeResponse {
        id: account.id,
        name: account.name,
        email: account.email,
    }))
}
