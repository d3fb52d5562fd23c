//! Site, domain, and setting rows: the site registry.
//!
//! Site creation is atomic: the site row, its primary domain, and the
//! default consent setting land in one transaction, so a site without
//! a domain is never observable. Hosts arrive here already normalized
//! by `porchlight_core::domain`.
//!
//! Every mutating or detail query is scoped to the owning account;
//! another account's site reads as absent, never as forbidden.

use std::collections::BTreeMap;

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

use porchlight_core::generate_site_key;
use porchlight_core::sdk::ConsentDefault;

use super::{is_unique_violation, now_rfc3339, Result, Store, StoreError};

/// Attempts before a site-key UNIQUE collision becomes a hard error.
/// With 192-bit keys a single collision already means a broken RNG.
const KEY_RETRY_LIMIT: usize = 4;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";

#[derive(Debug, Clone, Serialize)]
pub struct Site {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub site_key: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Domain {
    pub id: String,
    pub site_id: String,
    pub host: String,
    pub is_primary: bool,
    pub created_at: String,
}

/// Outcome of appending a domain to a site.
#[derive(Debug)]
pub enum AddDomainOutcome {
    Added(Domain),
    /// The site is absent or owned by another account.
    SiteNotFound,
    /// The host is already registered on this site.
    DuplicateHost,
}

/// A site together with its domains and settings, for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct SiteDetail {
    #[serde(flatten)]
    pub site: Site,
    pub domains: Vec<Domain>,
    pub settings: BTreeMap<String, String>,
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<Site> {
    Ok(Site {
        id: row.get("id")?,
        account_id: row.get("account_id")?,
        name: row.get("name")?,
        site_key: row.get("site_key")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
    })
}

fn domain_from_row(row: &Row<'_>) -> rusqlite::Result<Domain> {
    Ok(Domain {
        id: row.get("id")?,
        site_id: row.get("site_id")?,
        host: row.get("host")?,
        is_primary: row.get::<_, i64>("is_primary")? != 0,
        created_at: row.get("created_at")?,
    })
}

impl Store {
    /// Create a site with its primary domain and the default consent
    /// setting, atomically. `host` must already be normalized.
    pub fn create_site(&self, account_id: &str, name: &str, host: &str) -> Result<Site> {
        let mut conn = self.lock_conn();
        let tx = conn.transaction()?;
        let now = now_rfc3339();

        let site = {
            let id = Uuid::new_v4().to_string();
            let mut site_key = generate_site_key();
            let mut attempts = 0;
            loop {
                let inserted = tx.execute(
                    "INSERT INTO sites (id, account_id, name, site_key, status, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![id, account_id, name, site_key, STATUS_ACTIVE, now],
                );
                match inserted {
                    Ok(_) => {
                        break Site {
                            id: id.clone(),
                            account_id: account_id.to_string(),
                            name: name.to_string(),
                            site_key: site_key.clone(),
                            status: STATUS_ACTIVE.to_string(),
                            created_at: now.clone(),
                        }
                    }
                    Err(e) if is_unique_violation(&e) && attempts + 1 < KEY_RETRY_LIMIT => {
                        attempts += 1;
                        site_key = generate_site_key();
                    }
                    Err(e) => return Err(StoreError::Database(e)),
                }
            }
        };

        tx.execute(
            "INSERT INTO site_domains (id, site_id, host, is_primary, created_at) \
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![Uuid::new_v4().to_string(), site.id, host, now],
        )?;

        tx.execute(
            "INSERT INTO site_settings (site_id, key, value) VALUES (?1, 'consent_default', ?2)",
            params![site.id, ConsentDefault::OptIn.as_str()],
        )?;

        tx.commit()?;
        Ok(site)
    }

    /// Append a non-primary domain to a site owned by `account_id`.
    /// A host already on the site is out-of-policy input, not a
    /// persistence failure.
    pub fn add_domain(
        &self,
        account_id: &str,
        site_id: &str,
        host: &str,
    ) -> Result<AddDomainOutcome> {
        let conn = self.lock_conn();

        let owned: Option<String> = conn
            .query_row(
                "SELECT id FROM sites WHERE id = ?1 AND account_id = ?2",
                params![site_id, account_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Ok(AddDomainOutcome::SiteNotFound);
        }

        let domain = Domain {
            id: Uuid::new_v4().to_string(),
            site_id: site_id.to_string(),
            host: host.to_string(),
            is_primary: false,
            created_at: now_rfc3339(),
        };

        let inserted = conn.execute(
            "INSERT INTO site_domains (id, site_id, host, is_primary, created_at) \
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![domain.id, domain.site_id, domain.host, domain.created_at],
        );

        match inserted {
            Ok(_) => Ok(AddDomainOutcome::Added(domain)),
            Err(e) if is_unique_violation(&e) => Ok(AddDomainOutcome::DuplicateHost),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Configuration resolution sees only active sites: inactive and
    /// missing are indistinguishable here.
    pub fn find_active_by_key(&self, site_key: &str) -> Result<Option<Site>> {
        let conn = self.lock_conn();
        let site = conn
            .query_row(
                "SELECT id, account_id, name, site_key, status, created_at \
                 FROM sites WHERE site_key = ?1 AND status = ?2",
                params![site_key, STATUS_ACTIVE],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    pub fn list_sites(&self, account_id: &str) -> Result<Vec<Site>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT id, account_id, name, site_key, status, created_at \
             FROM sites WHERE account_id = ?1 ORDER BY created_at DESC",
        )?;
        let sites = stmt
            .query_map(params![account_id], site_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sites)
    }

    pub fn get_site(&self, account_id: &str, site_id: &str) -> Result<Option<SiteDetail>> {
        let site = {
            let conn = self.lock_conn();
            conn.query_row(
                "SELECT id, account_id, name, site_key, status, created_at \
                 FROM sites WHERE id = ?1 AND account_id = ?2",
                params![site_id, account_id],
                site_from_row,
            )
            .optional()?
        };

        let Some(site) = site else {
            return Ok(None);
        };

        Ok(Some(SiteDetail {
            domains: self.domains_for_site(&site.id)?,
            settings: self.settings_for_site(&site.id)?,
            site,
        }))
    }

    /// Partial update of name/status. `Ok(None)` when absent or
    /// foreign. Setting status to anything but `active` removes the
    /// site from configuration resolution.
    pub fn update_site(
        &self,
        account_id: &str,
        site_id: &str,
        name: Option<&str>,
        status: Option<&str>,
    ) -> Result<Option<Site>> {
        let conn = self.lock_conn();
        conn.execute(
            "UPDATE sites SET name = COALESCE(?3, name), status = COALESCE(?4, status) \
             WHERE id = ?1 AND account_id = ?2",
            params![site_id, account_id, name, status],
        )?;

        let site = conn
            .query_row(
                "SELECT id, account_id, name, site_key, status, created_at \
                 FROM sites WHERE id = ?1 AND account_id = ?2",
                params![site_id, account_id],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    /// Upsert one setting. Returns whether the site exists and is
    /// owned by `account_id`.
    pub fn set_setting(
        &self,
        account_id: &str,
        site_id: &str,
        key: &str,
        value: &str,
    ) -> Result<bool> {
        let conn = self.lock_conn();

        let owned: Option<String> = conn
            .query_row(
                "SELECT id FROM sites WHERE id = ?1 AND account_id = ?2",
                params![site_id, account_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Ok(false);
        }

        conn.execute(
            "INSERT INTO site_settings (site_id, key, value) VALUES (?1, ?2, ?3) \
             ON CONFLICT(site_id, key) DO UPDATE SET value = excluded.value",
            params![site_id, key, value],
        )?;
        Ok(true)
    }

    pub fn domains_for_site(&self, site_id: &str) -> Result<Vec<Domain>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT id, site_id, host, is_primary, created_at \
             FROM site_domains WHERE site_id = ?1 ORDER BY is_primary DESC, created_at ASC",
        )?;
        let domains = stmt
            .query_map(params![site_id], domain_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(domains)
    }

    pub fn settings_for_site(&self, site_id: &str) -> Result<BTreeMap<String, String>> {
        let conn = self.lock_conn();
        let mut stmt =
            conn.prepare("SELECT key, value FROM site_settings WHERE site_id = ?1")?;
        let settings = stmt
            .query_map(params![site_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_account() -> (Store, String) {
        let store = Store::in_memory().unwrap();
        let account = store
            .create_account("a@x.com", None, "h")
            .unwrap()
            .expect("account");
        (store, account.id)
    }

    #[test]
    fn create_site_is_atomic_and_complete() {
        let (store, account_id) = store_with_account();
        let site = store.create_site(&account_id, "Acme", "acme.com").unwrap();

        assert!(site.site_key.starts_with("pl_"));
        assert_eq!(site.status, STATUS_ACTIVE);

        let domains = store.domains_for_site(&site.id).unwrap();
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0].host, "acme.com");
        assert!(domains[0].is_primary);

        let settings = store.settings_for_site(&site.id).unwrap();
        assert_eq!(settings.get("consent_default").map(String::as_str), Some("opt_in"));
    }

    #[test]
    fn add_domain_appends_non_primary() {
        let (store, account_id) = store_with_account();
        let site = store.create_site(&account_id, "Acme", "acme.com").unwrap();

        let outcome = store
            .add_domain(&account_id, &site.id, "acme.co.uk")
            .unwrap();
        let AddDomainOutcome::Added(domain) = outcome else {
            panic!("expected Added, got {outcome:?}");
        };
        assert!(!domain.is_primary);

        let domains = store.domains_for_site(&site.id).unwrap();
        assert_eq!(domains.len(), 2);
        // Primary sorts first.
        assert!(domains[0].is_primary);
    }

    #[test]
    fn add_domain_to_missing_or_foreign_site_is_not_found() {
        let (store, account_id) = store_with_account();
        assert!(matches!(
            store
                .add_domain(&account_id, "no-such-site", "acme.com")
                .unwrap(),
            AddDomainOutcome::SiteNotFound
        ));

        let other = store
            .create_account("b@x.com", None, "h")
            .unwrap()
            .expect("account");
        let site = store.create_site(&other.id, "Other", "other.com").unwrap();
        assert!(matches!(
            store.add_domain(&account_id, &site.id, "acme.com").unwrap(),
            AddDomainOutcome::SiteNotFound
        ));
    }

    #[test]
    fn duplicate_host_is_reported_not_a_database_error() {
        let (store, account_id) = store_with_account();
        let site = store.create_site(&account_id, "Acme", "acme.com").unwrap();

        // The primary domain already holds this host.
        assert!(matches!(
            store.add_domain(&account_id, &site.id, "acme.com").unwrap(),
            AddDomainOutcome::DuplicateHost
        ));

        // Same for a host added through add_domain itself.
        assert!(matches!(
            store.add_domain(&account_id, &site.id, "acme.org").unwrap(),
            AddDomainOutcome::Added(_)
        ));
        assert!(matches!(
            store.add_domain(&account_id, &site.id, "acme.org").unwrap(),
            AddDomainOutcome::DuplicateHost
        ));

        // Nothing was appended by the rejected inserts.
        assert_eq!(store.domains_for_site(&site.id).unwrap().len(), 2);
    }

    #[test]
    fn find_active_by_key_hides_inactive() {
        let (store, account_id) = store_with_account();
        let site = store.create_site(&account_id, "Acme", "acme.com").unwrap();

        assert!(store.find_active_by_key(&site.site_key).unwrap().is_some());

        store
            .update_site(&account_id, &site.id, None, Some(STATUS_INACTIVE))
            .unwrap()
            .expect("updated");
        assert!(store.find_active_by_key(&site.site_key).unwrap().is_none());
        assert!(store.find_active_by_key("pl_unknown").unwrap().is_none());
    }

    #[test]
    fn update_site_is_partial() {
        let (store, account_id) = store_with_account();
        let site = store.create_site(&account_id, "Acme", "acme.com").unwrap();

        let renamed = store
            .update_site(&account_id, &site.id, Some("Acme Homes"), None)
            .unwrap()
            .expect("updated");
        assert_eq!(renamed.name, "Acme Homes");
        assert_eq!(renamed.status, STATUS_ACTIVE);
    }

    #[test]
    fn settings_upsert() {
        let (store, account_id) = store_with_account();
        let site = store.create_site(&account_id, "Acme", "acme.com").unwrap();

        assert!(store
            .set_setting(&account_id, &site.id, "consent_default", "opt_out")
            .unwrap());
        assert!(store
            .set_setting(&account_id, &site.id, "grouping_enabled", "false")
            .unwrap());
        assert!(!store
            .set_setting(&account_id, "no-such-site", "k", "v")
            .unwrap());

        let settings = store.settings_for_site(&site.id).unwrap();
        assert_eq!(settings.get("consent_default").map(String::as_str), Some("opt_out"));
        assert_eq!(settings.get("grouping_enabled").map(String::as_str), Some("false"));
    }

    #[test]
    fn list_sites_is_scoped_to_account() {
        let (store, account_id) = store_with_account();
        store.create_site(&account_id, "One", "one.com").unwrap();
        store.create_site(&account_id, "Two", "two.com").unwrap();

        let other = store
            .create_account("b@x.com", None, "h")
            .unwrap()
            .expect("account");
        store.create_site(&other.id, "Theirs", "theirs.com").unwrap();

        assert_eq!(store.list_sites(&account_id).unwrap().len(), 2);
        assert_eq!(store.list_sites(&other.id).unwrap().len(), 1);
    }

    #[test]
    fn get_site_detail_includes_domains_and_settings() {
        let (store, account_id) = store_with_account();
        let site = store.create_site(&account_id, "Acme", "acme.com").unwrap();
        assert!(matches!(
            store.add_domain(&account_id, &site.id, "acme.org").unwrap(),
            AddDomainOutcome::Added(_)
        ));

        let detail = store
            .get_site(&account_id, &site.id)
            .unwrap()
            .expect("detail");
        assert_eq!(detail.domains.len(), 2);
        assert!(detail.settings.contains_key("consent_default"));

        assert!(store.get_site(&account_id, "no-such-site").unwrap().is_none());
    }
}
