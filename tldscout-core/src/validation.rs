//! Domain and registry URL validation helpers

use url::Url;

use crate::error::{EnrichError, Result};

/// Normalize and validate a domain name
///
/// This function:
/// - Removes http:// and https:// prefixes
/// - Removes www. prefix
/// - Removes trailing slashes and paths
/// - Converts to lowercase
/// - Validates format (must contain dots, only alphanumeric/hyphens/dots)
pub fn normalize_domain(domain: &str) -> Result<String> {
    let domain = domain.trim().to_lowercase();

    let domain = domain
        .strip_prefix("http://")
        .or_else(|| domain.strip_prefix("https://"))
        .unwrap_or(&domain);

    let domain = domain.split('/').next().unwrap_or(domain);
    let domain = domain.strip_prefix("www.").unwrap_or(domain);

    if domain.is_empty() || !domain.contains('.') {
        return Err(EnrichError::InvalidDomain(domain.to_string()));
    }

    let valid = domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !valid {
        return Err(EnrichError::InvalidDomain(domain.to_string()));
    }

    if domain.contains("..") || domain.starts_with('.') || domain.ends_with('.') {
        return Err(EnrichError::InvalidDomain(domain.to_string()));
    }

    for label in domain.split('.') {
        if label.is_empty() || label.starts_with('-') || label.ends_with('-') {
            return Err(EnrichError::InvalidDomain(domain.to_string()));
        }
    }

    Ok(domain.to_string())
}

/// Top-level domain of `domain`: everything after the last dot, lowercased.
pub fn tld_of(domain: &str) -> Option<String> {
    let (_, tld) = domain.rsplit_once('.')?;
    if tld.is_empty() {
        None
    } else {
        Some(tld.to_lowercase())
    }
}

/// Validates a registry service base URL and returns it with a trailing slash.
pub fn normalize_service_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed)
        .map_err(|e| EnrichError::InvalidDirectory(format!("{}: {}", trimmed, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(EnrichError::InvalidDirectory(format!(
            "{}: registry services must be absolute http(s) URLs",
            trimmed
        )));
    }

    Ok(ensure_trailing_slash(trimmed))
}

pub(crate) fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
