//! Session cookie handling and the auth middleware.
//!
//! The cookie carries the signed token from `porchlight_core::session`
//! and nothing else; there is no server-side session table. Logout is
//! purely client-side: the cookie is overwritten with an immediate
//! expiry.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "porchlight_session";

/// Build the Set-Cookie value for a freshly minted session token.
pub fn build_session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the Set-Cookie value that clears the session.
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Extract the session token from the Cookie header, if present.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        pair.trim()
            .strip_prefix(SESSION_COOKIE)?
            .strip_prefix('=')
            .map(str::to_string)
    })
}

/// Identity established by a verified session cookie.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account_id: String,
}

/// Auth middleware for session-protected routes: verifies the cookie
/// and inserts [`AuthenticatedAccount`] for handlers to extract.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(request.headers()).ok_or(ApiError::Unauthorized)?;
    let claims = state
        .signer
        .verify(&token)
        .map_err(|_| ApiError::Unauthorized)?;

    request.extensions_mut().insert(AuthenticatedAccount {
        account_id: claims.sub,
    });
    Ok(next.run(request).await)
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedAccount {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedAccount>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}
