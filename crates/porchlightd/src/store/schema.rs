//! SQLite schema for porchlightd state.

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    email TEXT UNIQUE NOT NULL,
    name TEXT,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_login_at TEXT
);

CREATE TABLE IF NOT EXISTS sites (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL REFERENCES accounts(id),
    name TEXT NOT NULL,
    site_key TEXT UNIQUE NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sites_account_id ON sites(account_id);
CREATE INDEX IF NOT EXISTS idx_sites_site_key ON sites(site_key);

CREATE TABLE IF NOT EXISTS site_domains (
    id TEXT PRIMARY KEY,
    site_id TEXT NOT NULL REFERENCES sites(id),
    host TEXT NOT NULL,
    is_primary INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    UNIQUE(site_id, host)
);

CREATE INDEX IF NOT EXISTS idx_site_domains_site_id ON site_domains(site_id);

CREATE TABLE IF NOT EXISTS site_settings (
    site_id TEXT NOT NULL REFERENCES sites(id),
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY(site_id, key)
);
"#;
