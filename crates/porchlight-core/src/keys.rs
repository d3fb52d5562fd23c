//! Site key generation.
//!
//! Site keys are public (they ride in loader URLs on third-party
//! pages) but must be unguessable, not merely unique: knowing one
//! site's key must not help enumerate others.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// Prefix identifying a Porchlight site key at a glance.
pub const SITE_KEY_PREFIX: &str = "pl_";

/// Random bytes per key. 192 bits makes collision probability
/// negligible at any plausible site count; a database-level collision
/// is treated as a hard failure requiring regeneration.
const SITE_KEY_BYTES: usize = 24;

/// Generate a new site key: `pl_` + 24 CSPRNG bytes, base64url.
pub fn generate_site_key() -> String {
    let mut bytes = [0u8; SITE_KEY_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{SITE_KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}
