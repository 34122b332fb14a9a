use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::servers::{DEFAULT_RDAP_SERVER, FALLBACK_RDAP_SERVERS, RDAP_SERVERS};
use crate::error::{EnrichError, Result};
use crate::validation::{normalize_service_url, tld_of};

/// Number of candidate services per domain: the TLD primary plus the generic fallbacks.
pub const SERVICE_TIERS: usize = 4;

/// A registry lookup service base URL, always ending in `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEndpoint {
    pub base_url: String,
}

impl RegistryEndpoint {
    fn parse(raw: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_service_url(raw)?,
        })
    }
}

/// Maps top-level domains to their registry services.
///
/// Tier 0 is the TLD's primary service (or the generic default for unknown
/// TLDs). Tiers 1..=3 are generic fallbacks shared by every domain.
#[derive(Debug, Clone)]
pub struct RegistryDirectory {
    primaries: HashMap<String, RegistryEndpoint>,
    default_primary: RegistryEndpoint,
    fallbacks: Vec<RegistryEndpoint>,
}

impl Default for RegistryDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RegistryDirectory {
    /// Directory backed by the compiled-in server table.
    pub fn builtin() -> Self {
        let primaries = RDAP_SERVERS
            .iter()
            .map(|(tld, url)| {
                (
                    tld.to_string(),
                    RegistryEndpoint {
                        base_url: url.to_string(),
                    },
                )
            })
            .collect();

        Self {
            primaries,
            default_primary: RegistryEndpoint {
                base_url: DEFAULT_RDAP_SERVER.to_string(),
            },
            fallbacks: FALLBACK_RDAP_SERVERS
                .iter()
                .map(|url| RegistryEndpoint {
                    base_url: url.to_string(),
                })
                .collect(),
        }
    }

    /// Builds a directory from an explicit table, validating every URL.
    pub fn new<I, K, V>(primaries: I, default_primary: &str, fallbacks: &[String]) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if fallbacks.len() != SERVICE_TIERS - 1 {
            return Err(EnrichError::InvalidDirectory(format!(
                "expected exactly {} fallback services, got {}",
                SERVICE_TIERS - 1,
                fallbacks.len()
            )));
        }

        let mut table = HashMap::new();
        for (tld, url) in primaries {
            let tld = tld.as_ref().trim().trim_start_matches('.').to_lowercase();
            if tld.is_empty() || tld.contains('.') {
                return Err(EnrichError::InvalidDirectory(format!(
                    "invalid TLD key '{}'",
                    tld
                )));
            }
            table.insert(tld, RegistryEndpoint::parse(url.as_ref())?);
        }

        Ok(Self {
            primaries: table,
            default_primary: RegistryEndpoint::parse(default_primary)?,
            fallbacks: fallbacks
                .iter()
                .map(|url| RegistryEndpoint::parse(url))
                .collect::<Result<_>>()?,
        })
    }

    /// Returns a copy with `overrides` layered over this directory's primaries.
    pub fn with_primaries<I, K, V>(mut self, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let fallbacks: Vec<String> = self.fallbacks.iter().map(|e| e.base_url.clone()).collect();
        let extra = Self::new(overrides, &self.default_primary.base_url, &fallbacks)?;
        self.primaries.extend(extra.primaries);
        Ok(self)
    }

    /// Service URL for `domain` at `fallback_index`.
    ///
    /// Returns `None` once `fallback_index` reaches [`SERVICE_TIERS`]: every
    /// candidate has been tried and the caller must stop.
    pub fn resolve_service_url(&self, domain: &str, fallback_index: usize) -> Option<&str> {
        match fallback_index {
            0 => Some(self.primary_for(domain).base_url.as_str()),
            i if i < SERVICE_TIERS => self.fallbacks.get(i - 1).map(|e| e.base_url.as_str()),
            _ => None,
        }
    }

    fn primary_for(&self, domain: &str) -> &RegistryEndpoint {
        tld_of(domain)
            .and_then(|tld| self.primaries.get(&tld))
            .unwrap_or(&self.default_primary)
    }

    pub fn default_primary(&self) -> &RegistryEndpoint {
        &self.default_primary
    }

    pub fn fallbacks(&self) -> &[RegistryEndpoint] {
        &self.fallbacks
    }

    /// Primary services keyed by TLD, sorted for display.
    pub fn primaries(&self) -> BTreeMap<&str, &RegistryEndpoint> {
        self.primaries
            .iter()
            .map(|(tld, endpoint)| (tld.as_str(), endpoint))
            .collect()
    }
}
