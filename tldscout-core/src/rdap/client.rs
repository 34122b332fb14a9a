use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::types::RdapResponse;
use crate::error::{LookupError, Result};
use crate::validation::ensure_trailing_slash;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_USER_AGENT: &str = concat!("tldscout/", env!("CARGO_PKG_VERSION"), " (RDAP Client)");

/// One request against one registry service.
///
/// Implementations classify every failure into a [`LookupError`]; retry and
/// fallback policy belongs to the caller.
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    async fn request(
        &self,
        service_url: &str,
        domain: &str,
    ) -> std::result::Result<RdapResponse, LookupError>;
}

#[derive(Debug, Clone)]
pub struct RdapClient {
    http: Client,
    timeout: Duration,
}

impl RdapClient {
    pub fn new() -> Result<Self> {
        Self::with_settings(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    pub fn with_settings(timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl RegistryLookup for RdapClient {
    #[instrument(skip(self), fields(service = %service_url, domain = %domain))]
    async fn request(
        &self,
        service_url: &str,
        domain: &str,
    ) -> std::result::Result<RdapResponse, LookupError> {
        let url = format!("{}domain/{}", ensure_trailing_slash(service_url), domain);
        debug!(url = %url, "Querying RDAP");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/rdap+json, application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LookupError::Other(format!("request timed out after {:?}", self.timeout))
                } else {
                    LookupError::Other(format!("request failed: {}", e))
                }
            })?;

        if let Some(error) = LookupError::from_status(response.status().as_u16()) {
            debug!(status = response.status().as_u16(), error = %error, "RDAP query rejected");
            return Err(error);
        }

        response
            .json::<RdapResponse>()
            .await
            .map_err(|e| LookupError::Other(format!("invalid RDAP payload: {}", e)))
    }
}
