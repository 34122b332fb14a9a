//! In-memory registry fakes shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;

use crate::error::LookupError;
use crate::rdap::{RdapResponse, RegistryLookup};
use crate::registry::RegistryDirectory;

pub const SVC_COM: &str = "https://svc-com.test/";
pub const SVC_NET: &str = "https://svc-net.test/";
pub const SVC_DEFAULT: &str = "https://svc-default.test/";
pub const FB1: &str = "https://fallback-1.test/";
pub const FB2: &str = "https://fallback-2.test/";
pub const FB3: &str = "https://fallback-3.test/";

pub fn test_directory() -> RegistryDirectory {
    RegistryDirectory::new(
        [("com", SVC_COM), ("net", SVC_NET)],
        SVC_DEFAULT,
        &[FB1.to_string(), FB2.to_string(), FB3.to_string()],
    )
    .expect("test directory is valid")
}

pub fn registrant_response(name: &str) -> RdapResponse {
    serde_json::from_value(json!({
        "entities": [{
            "roles": ["registrant"],
            "vcardArray": ["vcard", [["fn", {}, "text", name]]]
        }]
    }))
    .expect("valid RDAP fixture")
}

type Outcome = Result<RdapResponse, LookupError>;

#[derive(Debug, Clone)]
pub struct Call {
    pub service_url: String,
    pub domain: String,
    pub at: Instant,
}

/// Replays queued outcomes per `(service, domain)`; unscripted requests get
/// the fallback outcome.
pub struct ScriptedLookup {
    scripts: Mutex<HashMap<(String, String), VecDeque<Outcome>>>,
    fallback: Outcome,
    calls: Mutex<Vec<Call>>,
    latency: Duration,
}

impl ScriptedLookup {
    /// Unscripted requests fail with a generic error.
    pub fn new() -> Self {
        Self::failing(LookupError::Other("unscripted request".to_string()))
    }

    pub fn failing(error: LookupError) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: Err(error),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Unscripted requests succeed with a record for the requested domain.
    pub fn succeeding() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: Ok(registrant_response("Default Owner")),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Every request takes `latency` to answer. Calls are recorded when sent.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push(&self, service_url: &str, domain: &str, outcome: Outcome) {
        self.scripts
            .lock()
            .unwrap()
            .entry((service_url.to_string(), domain.to_string()))
            .or_default()
            .push_back(outcome);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn services_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.service_url).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls().into_iter().map(|c| c.at).collect()
    }
}

#[async_trait]
impl RegistryLookup for ScriptedLookup {
    async fn request(&self, service_url: &str, domain: &str) -> Outcome {
        self.calls.lock().unwrap().push(Call {
            service_url: service_url.to_string(),
            domain: domain.to_string(),
            at: Instant::now(),
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.scripts
            .lock()
            .unwrap()
            .get_mut(&(service_url.to_string(), domain.to_string()))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone())
    }
}
