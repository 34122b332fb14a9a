use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an enrichment record came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    #[default]
    Registry,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registrant {
    pub name: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
}

/// Ownership and contact metadata resolved for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentRecord {
    pub registrant: Registrant,
    pub nameservers: Vec<String>,
    pub status: Option<String>,
    pub registration_date: Option<DateTime<Utc>>,
    pub source: RecordSource,
}

/// Per-domain outcome of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainResult {
    pub domain: String,
    pub data: Option<EnrichmentRecord>,
    pub success: bool,
    pub error: Option<String>,
}

impl DomainResult {
    pub fn success(domain: impl Into<String>, record: EnrichmentRecord) -> Self {
        Self {
            domain: domain.into(),
            data: Some(record),
            success: true,
            error: None,
        }
    }

    pub fn failure(domain: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            data: None,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Value for a storage row's `enrichmentSource`: `"registry"` when a
    /// record was obtained, `"default"` when only a placeholder can be stored.
    pub fn enrichment_source(&self) -> &'static str {
        match &self.data {
            Some(_) => "registry",
            None => "default",
        }
    }
}
