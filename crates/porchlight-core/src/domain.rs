//! FQDN validation/normalization and allow-list host matching.
//!
//! Hosts enter the system at two points: an administrator registering a
//! domain for a site, and a browser reporting the page hostname at
//! bootstrap time. Registration goes through [`normalize_fqdn`] so the
//! allow-list only ever contains well-formed lower-case hostnames;
//! matching at bootstrap time goes through [`host_allowed`].

use crate::error::{Error, Result};

/// RFC 1035 limits.
const MAX_FQDN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Validate and normalize a fully-qualified hostname.
///
/// Normalization: surrounding whitespace is trimmed, one trailing dot is
/// stripped, and the result is lower-cased. Rejected inputs: the empty
/// string, IP literals (v4 and v6), wildcard labels, empty labels,
/// labels longer than 63 bytes, names longer than 253 bytes, characters
/// outside `[a-z0-9-]`, labels that begin or end with a hyphen, and
/// single-label names (a registrable domain has at least two labels).
pub fn normalize_fqdn(host: &str) -> Result<String> {
    let invalid = |reason: &'static str| Error::InvalidDomain {
        host: host.to_string(),
        reason,
    };

    let mut trimmed = host.trim();
    if let Some(stripped) = trimmed.strip_suffix('.') {
        trimmed = stripped;
    }
    if trimmed.is_empty() {
        return Err(invalid("empty hostname"));
    }
    if trimmed.len() > MAX_FQDN_LEN {
        return Err(invalid("hostname exceeds 253 bytes"));
    }

    let lowered = trimmed.to_ascii_lowercase();

    if lowered.contains('*') {
        return Err(invalid("wildcard labels are not allowed"));
    }
    if lowered.parse::<std::net::IpAddr>().is_ok() || lowered.contains(':') {
        return Err(invalid("IP literals are not allowed"));
    }

    let labels: Vec<&str> = lowered.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid("not a fully-qualified name"));
    }
    for label in &labels {
        if label.is_empty() {
            return Err(invalid("empty label"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(invalid("label exceeds 63 bytes"));
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(invalid("invalid character"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("label begins or ends with a hyphen"));
        }
    }

    Ok(lowered)
}

/// Whether `page_host` is covered by a single allowed domain.
///
/// Accepts an exact case-insensitive match, or a strict subdomain
/// (a suffix match on a `.` boundary). `blog.example.com` matches
/// `example.com`; `notexample.com` does not.
pub fn host_matches(page_host: &str, allowed: &str) -> bool {
    let page = page_host.trim().trim_end_matches('.').to_ascii_lowercase();
    let allowed = allowed.trim().trim_end_matches('.').to_ascii_lowercase();
    if page.is_empty() || allowed.is_empty() {
        return false;
    }

    page == allowed
        || (page.len() > allowed.len()
            && page.ends_with(&allowed)
            && page.as_bytes()[page.len() - allowed.len() - 1] == b'.')
}

/// Whether `page_host` is covered by any entry of an allow-list.
pub fn host_allowed(page_host: &str, allowed_domains: &[String]) -> bool {
    allowed_domains.iter().any(|d| host_matches(page_host, d))
}
