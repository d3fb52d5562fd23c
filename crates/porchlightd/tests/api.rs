//! End-to-end tests driving the real router over HTTP.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;

use porchlightd::api;
use porchlightd::config::Config;
use porchlightd::state::AppState;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    // Held for the lifetime of the server so the database survives.
    _dir: tempfile::TempDir,
}

async fn spawn_server() -> TestServer {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        database: dir.path().join("test.db"),
        base_url: "http://app.test".to_string(),
        session_secret: "test-session-secret".to_string(),
        // Re-resolve on every request so config changes are visible
        // immediately to the assertions below.
        config_cache_ttl_secs: 0,
        ..Config::default()
    };

    let state = AppState::new(config).expect("state");
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client");

    TestServer {
        base_url: format!("http://{addr}"),
        client,
        _dir: dir,
    }
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/register"))
            .json(&json!({ "email": email, "password": password, "name": "Ann" }))
            .send()
            .await
            .expect("register")
    }

    /// Log in and return the session token from the Set-Cookie header.
    async fn login_token(&self, email: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login");
        assert_eq!(resp.status(), StatusCode::OK);

        let cookie = resp
            .headers()
            .get("set-cookie")
            .expect("set-cookie header")
            .to_str()
            .expect("ascii")
            .to_string();
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));

        cookie
            .split(';')
            .next()
            .and_then(|pair| pair.strip_prefix("porchlight_session="))
            .expect("session cookie value")
            .to_string()
    }

    fn cookie(&self, token: &str) -> String {
        format!("porchlight_session={token}")
    }
}

#[tokio::test]
async fn health_reports_version() {
    let server = spawn_server().await;
    let resp = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .expect("health");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn register_login_me_flow() {
    let server = spawn_server().await;

    // Fresh registration succeeds.
    let resp = server.register("a@x.com", "password123").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["ok"], true);

    // Same email again is a conflict, case-insensitively.
    let resp = server.register("A@X.com", "password123").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Wrong password is a 401 indistinguishable from an unknown email.
    let resp = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "a@x.com", "password": "wrongwrong" }))
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let wrong_pw: serde_json::Value = resp.json().await.expect("json");

    let resp = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "nobody@x.com", "password": "password123" }))
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let unknown: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(wrong_pw, unknown);

    // Correct password mints a session cookie that /auth/me honors.
    let token = server.login_token("a@x.com", "password123").await;
    let resp = server
        .client
        .get(server.url("/auth/me"))
        .header("cookie", server.cookie(&token))
        .send()
        .await
        .expect("me");
    assert_eq!(resp.status(), StatusCode::OK);
    let me: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(me["email"], "a@x.com");
    assert_eq!(me["name"], "Ann");
    assert!(me["id"].as_str().is_some());
}

#[tokio::test]
async fn register_validation() {
    let server = spawn_server().await;

    // Missing password.
    let resp = server
        .client
        .post(server.url("/auth/register"))
        .json(&json!({ "email": "a@x.com" }))
        .send()
        .await
        .expect("register");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Malformed email.
    let resp = server.register("not-an-email", "password123").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Out-of-policy password length.
    let resp = server.register("a@x.com", "short").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_required_for_protected_routes() {
    let server = spawn_server().await;

    let resp = server
        .client
        .get(server.url("/auth/me"))
        .send()
        .await
        .expect("me");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .client
        .post(server.url("/sites"))
        .json(&json!({ "name": "Acme", "domain": "acme.com" }))
        .send()
        .await
        .expect("sites");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // A tampered cookie is rejected, not just a missing one.
    let resp = server
        .client
        .get(server.url("/auth/me"))
        .header("cookie", "porchlight_session=forged.token.value")
        .send()
        .await
        .expect("me");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn site_provisioning_and_config_resolution() {
    let server = spawn_server().await;
    server.register("a@x.com", "password123").await;
    let token = server.login_token("a@x.com", "password123").await;

    // Provision a site.
    let resp = server
        .client
        .post(server.url("/sites"))
        .header("cookie", server.cookie(&token))
        .json(&json!({ "name": "Acme", "domain": "Acme.COM" }))
        .send()
        .await
        .expect("create site");
    assert_eq!(resp.status(), StatusCode::OK);
    let site: serde_json::Value = resp.json().await.expect("json");
    let site_key = site["siteKey"].as_str().expect("siteKey").to_string();
    let site_id = site["id"].as_str().expect("id").to_string();
    assert!(site_key.starts_with("pl_"));
    assert_eq!(
        site["loaderUrl"],
        format!("http://app.test/sdk/loader?site={site_key}")
    );

    // Invalid domains are rejected.
    for bad in ["192.168.0.1", "*.acme.com", "localhost", "bad..host"] {
        let resp = server
            .client
            .post(server.url("/sites"))
            .header("cookie", server.cookie(&token))
            .json(&json!({ "name": "Bad", "domain": bad }))
            .send()
            .await
            .expect("create site");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "domain {bad}");
    }

    // The public config endpoint needs no session.
    let resp = server
        .client
        .get(server.url(&format!("/sdk/site-config?site={site_key}")))
        .send()
        .await
        .expect("site-config");
    assert_eq!(resp.status(), StatusCode::OK);
    let config: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(config["trackingKey"], site_key.as_str());
    assert_eq!(config["apiHost"], "http://app.test");
    assert_eq!(config["allowedDomains"], json!(["acme.com"]));
    assert_eq!(config["consentDefault"], "opt_in");
    assert_eq!(config["groupingEnabled"], true);

    // Additional domains show up in the allow-list.
    let resp = server
        .client
        .post(server.url(&format!("/sites/{site_id}/domains")))
        .header("cookie", server.cookie(&token))
        .json(&json!({ "host": "acme.co.uk" }))
        .send()
        .await
        .expect("add domain");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server
        .client
        .get(server.url(&format!("/sdk/site-config?site={site_key}")))
        .send()
        .await
        .expect("site-config");
    let config: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(config["allowedDomains"], json!(["acme.com", "acme.co.uk"]));

    // A host already on the site is a conflict, not a server error,
    // and the primary host counts.
    for dup in ["acme.co.uk", "ACME.com."] {
        let resp = server
            .client
            .post(server.url(&format!("/sites/{site_id}/domains")))
            .header("cookie", server.cookie(&token))
            .json(&json!({ "host": dup }))
            .send()
            .await
            .expect("add domain");
        assert_eq!(resp.status(), StatusCode::CONFLICT, "host {dup}");
        let body: serde_json::Value = resp.json().await.expect("json");
        assert_eq!(body["error"], "domain_taken");
    }

    // Settings flow through to the config.
    let resp = server
        .client
        .put(server.url(&format!("/sites/{site_id}/settings/consent_default")))
        .header("cookie", server.cookie(&token))
        .json(&json!({ "value": "opt_out" }))
        .send()
        .await
        .expect("set setting");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server
        .client
        .get(server.url(&format!("/sdk/site-config?site={site_key}")))
        .send()
        .await
        .expect("site-config");
    let config: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(config["consentDefault"], "opt_out");
}

#[tokio::test]
async fn config_endpoint_hides_unknown_and_inactive_sites() {
    let server = spawn_server().await;
    server.register("a@x.com", "password123").await;
    let token = server.login_token("a@x.com", "password123").await;

    let resp = server
        .client
        .get(server.url("/sdk/site-config"))
        .send()
        .await
        .expect("site-config");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .get(server.url("/sdk/site-config?site=pl_unknown"))
        .send()
        .await
        .expect("site-config");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let unknown: serde_json::Value = resp.json().await.expect("json");

    // Provision then deactivate.
    let resp = server
        .client
        .post(server.url("/sites"))
        .header("cookie", server.cookie(&token))
        .json(&json!({ "name": "Acme", "domain": "acme.com" }))
        .send()
        .await
        .expect("create site");
    let site: serde_json::Value = resp.json().await.expect("json");
    let site_key = site["siteKey"].as_str().expect("siteKey").to_string();
    let site_id = site["id"].as_str().expect("id").to_string();

    let resp = server
        .client
        .patch(server.url(&format!("/sites/{site_id}")))
        .header("cookie", server.cookie(&token))
        .json(&json!({ "status": "inactive" }))
        .send()
        .await
        .expect("patch");
    assert_eq!(resp.status(), StatusCode::OK);

    // Correct key, inactive site: indistinguishable from unknown.
    let resp = server
        .client
        .get(server.url(&format!("/sdk/site-config?site={site_key}")))
        .send()
        .await
        .expect("site-config");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let inactive: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(unknown, inactive);

    // Unknown status values are rejected.
    let resp = server
        .client
        .patch(server.url(&format!("/sites/{site_id}")))
        .header("cookie", server.cookie(&token))
        .json(&json!({ "status": "paused" }))
        .send()
        .await
        .expect("patch");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sites_are_scoped_to_their_owner() {
    let server = spawn_server().await;
    server.register("a@x.com", "password123").await;
    server.register("b@x.com", "password123").await;
    let token_a = server.login_token("a@x.com", "password123").await;
    let token_b = server.login_token("b@x.com", "password123").await;

    let resp = server
        .client
        .post(server.url("/sites"))
        .header("cookie", server.cookie(&token_a))
        .json(&json!({ "name": "Acme", "domain": "acme.com" }))
        .send()
        .await
        .expect("create site");
    let site: serde_json::Value = resp.json().await.expect("json");
    let site_id = site["id"].as_str().expect("id").to_string();

    // The other account sees 404, not 403.
    let resp = server
        .client
        .get(server.url(&format!("/sites/{site_id}")))
        .header("cookie", server.cookie(&token_b))
        .send()
        .await
        .expect("get site");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = server
        .client
        .post(server.url(&format!("/sites/{site_id}/domains")))
        .header("cookie", server.cookie(&token_b))
        .json(&json!({ "host": "evil.com" }))
        .send()
        .await
        .expect("add domain");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // The owner's listing has it; the other account's does not.
    let resp = server
        .client
        .get(server.url("/sites"))
        .header("cookie", server.cookie(&token_a))
        .send()
        .await
        .expect("list");
    let mine: Vec<serde_json::Value> = resp.json().await.expect("json");
    assert_eq!(mine.len(), 1);

    let resp = server
        .client
        .get(server.url("/sites"))
        .header("cookie", server.cookie(&token_b))
        .send()
        .await
        .expect("list");
    let theirs: Vec<serde_json::Value> = resp.json().await.expect("json");
    assert!(theirs.is_empty());
}

#[tokio::test]
async fn loader_is_fixed_and_cacheable() {
    let server = spawn_server().await;

    let resp = server
        .client
        .get(server.url("/sdk/loader?site=pl_whatever"))
        .send()
        .await
        .expect("loader");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").expect("content-type"),
        "application/javascript; charset=utf-8"
    );
    assert_eq!(
        resp.headers().get("cache-control").expect("cache-control"),
        "public, max-age=300"
    );
    let body_a = resp.text().await.expect("body");

    // Identical bytes regardless of the query string.
    let resp = server
        .client
        .get(server.url("/sdk/loader?site=pl_other"))
        .send()
        .await
        .expect("loader");
    let body_b = resp.text().await.expect("body");
    assert_eq!(body_a, body_b);
    assert!(body_a.contains("/sdk/site-config"));
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let server = spawn_server().await;
    server.register("a@x.com", "password123").await;
    let token = server.login_token("a@x.com", "password123").await;

    let resp = server
        .client
        .post(server.url("/auth/logout"))
        .header("cookie", server.cookie(&token))
        .send()
        .await
        .expect("logout");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get("location").expect("location"), "/");

    let cookie = resp
        .headers()
        .get("set-cookie")
        .expect("set-cookie")
        .to_str()
        .expect("ascii");
    assert!(cookie.starts_with("porchlight_session=;"));
    assert!(cookie.contains("Max-Age=0"));
}
