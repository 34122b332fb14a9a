//! Registry enrichment for batches of domain names.
//!
//! [`BatchEnricher`] groups domains by TLD and resolves each one through a
//! [`DomainResolver`], which walks the registry services listed in a
//! [`RegistryDirectory`] while a shared [`ServerStateTracker`] paces requests
//! and tracks rate-limit cooldowns per service.

pub mod bulk;
pub mod config;
pub mod error;
pub mod rdap;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod retry;
pub mod tracker;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{EnrichError, LookupError, Result};
pub use validation::normalize_domain;

pub use bulk::{
    parse_domains_from_file, BatchEnricher, BatchOptions, EnrichmentReport, ProgressCallback,
    ProgressSnapshot, ProgressTracker,
};
pub use config::EngineConfig;
pub use rdap::{RdapClient, RdapResponse, RegistryLookup};
pub use record::{DomainResult, EnrichmentRecord, RecordSource, Registrant};
pub use registry::{RegistryDirectory, RegistryEndpoint};
pub use resolver::DomainResolver;
pub use retry::RetryPolicy;
pub use tracker::{Clearance, ServerStateTracker, ServiceStatus};
