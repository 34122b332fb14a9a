//! TOML configuration for the enrichment engine.
//!
//! Every key is optional; missing keys keep the built-in defaults.
//!
//! ```toml
//! [batch]
//! concurrent_per_partition = 3
//! delay_between_batches_ms = 1000
//! retries_per_domain = 2
//!
//! [pacing]
//! base_delay_ms = 2000
//! cooldown_minutes = 5
//!
//! [registries.tlds]
//! io = "https://rdap.identitydigital.services/rdap/"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::bulk::{BatchEnricher, BatchOptions};
use crate::error::{EnrichError, Result};
use crate::rdap::{RdapClient, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::registry::RegistryDirectory;
use crate::retry::RetryPolicy;
use crate::tracker::ServerStateTracker;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub batch: BatchSection,
    #[serde(default)]
    pub pacing: PacingSection,
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub registries: RegistriesSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchSection {
    pub concurrent_per_partition: Option<usize>,
    pub delay_between_batches_ms: Option<u64>,
    pub retries_per_domain: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacingSection {
    pub base_delay_ms: Option<u64>,
    pub cooldown_minutes: Option<u64>,
    pub penalty_window_minutes: Option<u64>,
    pub backoff_initial_ms: Option<u64>,
    pub backoff_max_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistriesSection {
    /// Primary service for TLDs without an entry.
    pub default: Option<String>,
    /// Replaces the three generic fallback services.
    pub fallbacks: Option<Vec<String>>,
    /// Per-TLD primaries layered over the built-in table.
    #[serde(default)]
    pub tlds: BTreeMap<String, String>,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading configuration file");
        let content = std::fs::read_to_string(path).map_err(|source| EnrichError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn batch_options(&self) -> Result<BatchOptions> {
        let defaults = BatchOptions::default();
        let options = BatchOptions {
            concurrent_per_partition: self
                .batch
                .concurrent_per_partition
                .unwrap_or(defaults.concurrent_per_partition),
            delay_between_batches: self
                .batch
                .delay_between_batches_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.delay_between_batches),
            retries_per_domain: self
                .batch
                .retries_per_domain
                .unwrap_or(defaults.retries_per_domain),
        };
        options.validate()?;
        Ok(options)
    }

    pub fn tracker(&self) -> ServerStateTracker {
        let mut tracker = ServerStateTracker::new();
        if let Some(ms) = self.pacing.base_delay_ms {
            tracker = tracker.with_base_delay(Duration::from_millis(ms));
        }
        if let Some(minutes) = self.pacing.cooldown_minutes {
            tracker = tracker.with_cooldown(Duration::from_secs(minutes * 60));
        }
        if let Some(minutes) = self.pacing.penalty_window_minutes {
            tracker = tracker.with_penalty_window(Duration::from_secs(minutes * 60));
        }
        tracker
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default();
        if let Some(ms) = self.pacing.backoff_initial_ms {
            policy = policy.with_initial_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.pacing.backoff_max_ms {
            policy = policy.with_max_delay(Duration::from_millis(ms));
        }
        policy
    }

    pub fn directory(&self) -> Result<RegistryDirectory> {
        let registries = &self.registries;
        let base = if registries.default.is_none() && registries.fallbacks.is_none() {
            RegistryDirectory::builtin()
        } else {
            let builtin = RegistryDirectory::builtin();
            let default = registries
                .default
                .clone()
                .unwrap_or_else(|| builtin.default_primary().base_url.clone());
            let fallbacks = registries.fallbacks.clone().unwrap_or_else(|| {
                builtin
                    .fallbacks()
                    .iter()
                    .map(|e| e.base_url.clone())
                    .collect()
            });
            let primaries: Vec<(String, String)> = builtin
                .primaries()
                .into_iter()
                .map(|(tld, e)| (tld.to_string(), e.base_url.clone()))
                .collect();
            RegistryDirectory::new(primaries, &default, &fallbacks)?
        };

        if registries.tlds.is_empty() {
            Ok(base)
        } else {
            base.with_primaries(&registries.tlds)
        }
    }

    pub fn client(&self) -> Result<RdapClient> {
        let timeout = self
            .client
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(EnrichError::InvalidConfig(
                "client timeout must be greater than zero".to_string(),
            ));
        }
        let user_agent = self.client.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        RdapClient::with_settings(timeout, user_agent)
    }

    /// Assembles a ready-to-run enricher from every section.
    pub fn build_enricher(&self) -> Result<BatchEnricher> {
        let enricher = BatchEnricher::with_client(
            Arc::new(self.directory()?),
            Arc::new(self.tracker()),
            Arc::new(self.client()?),
        )
        .with_retry_policy(self.retry_policy())
        .with_options(self.batch_options()?);

        Ok(enricher)
    }
}
