//! Password hashing and verification using Argon2id.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::{Error, Result};

/// Minimum accepted password length in bytes.
pub const MIN_PASSWORD_BYTES: usize = 8;

/// Maximum accepted password length in bytes.
///
/// Argon2 cost scales with input size; the bound is enforced before
/// hashing so pathological inputs never reach the KDF.
pub const MAX_PASSWORD_BYTES: usize = 128;

/// Hash a plaintext password with Argon2id and a per-call random salt.
///
/// Returns a PHC-format string (`$argon2id$...`) carrying the salt and
/// parameters alongside the digest. Rejects passwords outside the
/// accepted length range before any hashing work is done.
pub fn hash_password(password: &str) -> Result<String> {
    if password.len() < MIN_PASSWORD_BYTES || password.len() > MAX_PASSWORD_BYTES {
        return Err(Error::PasswordLength {
            min: MIN_PASSWORD_BYTES,
            max: MAX_PASSWORD_BYTES,
        });
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Hashing(e.to_string()))
}

/// Verify a plaintext password against a stored PHC-format hash.
///
/// Returns `false` on mismatch and on malformed hashes: a corrupt row
/// in the accounts table must read as a failed login, never a panic or
/// a surfaced error. Argon2 verification is the constant-time-equivalent
/// comparison.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match argon2::PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
