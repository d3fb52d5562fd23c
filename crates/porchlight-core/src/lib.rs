#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

//! # porchlight-core
//!
//! Trust and configuration primitives for the Porchlight analytics platform:
//!
//! - Argon2id password hashing and verification
//! - Stateless HMAC-signed session tokens
//! - FQDN validation and allow-list host matching
//! - Unguessable site key generation
//! - The public SDK configuration wire types
//! - The client bootstrap protocol and the loader program that executes it
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use porchlight_core::{hash_password, verify_password, SessionSigner};
//!
//! // Hash and verify a credential
//! let hash = hash_password("correct horse battery").unwrap();
//! assert!(verify_password("correct horse battery", &hash));
//! assert!(!verify_password("wrong", &hash));
//!
//! // Mint and verify a session token
//! let signer = SessionSigner::new(b"server-held secret", Duration::from_secs(3600));
//! let token = signer.sign("account-1").unwrap();
//! assert_eq!(signer.verify(&token).unwrap().sub, "account-1");
//! ```

pub mod bootstrap;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod keys;
pub mod loader;
pub mod sdk;
pub mod session;

pub use bootstrap::{BootstrapEnv, BootstrapRules, Halt, LoadSequence, LoadStep};
pub use credentials::{hash_password, verify_password};
pub use domain::{host_allowed, host_matches, normalize_fqdn};
pub use error::{Error, Result};
pub use keys::generate_site_key;
pub use loader::{LOADER_CACHE_CONTROL, LOADER_CONTENT_TYPE, LOADER_JS};
pub use sdk::{ConsentDefault, SdkConfig};
pub use session::{SessionClaims, SessionSigner};
