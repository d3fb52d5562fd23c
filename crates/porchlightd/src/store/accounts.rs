//! Account rows.
//!
//! Emails are stored trimmed and lower-cased; the caller normalizes
//! before reaching the store so lookups and the UNIQUE constraint
//! agree on one spelling.

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

use super::{is_unique_violation, now_rfc3339, Result, Store, StoreError};

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        password_hash: row.get("password_hash")?,
        created_at: row.get("created_at")?,
        last_login_at: row.get("last_login_at")?,
    })
}

impl Store {
    /// Insert a new account. Returns `Ok(None)` when the email is
    /// already registered.
    pub fn create_account(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<Option<Account>> {
        let conn = self.lock_conn();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            password_hash: password_hash.to_string(),
            created_at: now_rfc3339(),
            last_login_at: None,
        };

        let inserted = conn.execute(
            "INSERT INTO accounts (id, email, name, password_hash, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account.id,
                account.email,
                account.name,
                account.password_hash,
                account.created_at
            ],
        );

        match inserted {
            Ok(_) => Ok(Some(account)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    pub fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let conn = self.lock_conn();
        let account = conn
            .query_row(
                "SELECT id, email, name, password_hash, created_at, last_login_at \
                 FROM accounts WHERE email = ?1",
                params![email],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    pub fn find_account(&self, id: &str) -> Result<Option<Account>> {
        let conn = self.lock_conn();
        let account = conn
            .query_row(
                "SELECT id, email, name, password_hash, created_at, last_login_at \
                 FROM accounts WHERE id = ?1",
                params![id],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    /// Stamp a successful login.
    pub fn touch_last_login(&self, id: &str) -> Result<()> {
        let conn = self.lock_conn();
        conn.execute(
            "UPDATE accounts SET last_login_at = ?2 WHERE id = ?1",
            params![id, now_rfc3339()],
        )?;
        Ok(())
    }
}
