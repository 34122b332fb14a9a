//! Retry and fallback state machine for a single domain.
//!
//! A domain walks the service tiers of the [`RegistryDirectory`] in order.
//! Services cooling down after a 429 are skipped without a request, and so is
//! a tier whose URL this domain already tried. On each
//! remaining tier the domain gets up to `max_attempts` requests, paced by the
//! [`ServerStateTracker`], before the resolver moves on. Running out of tiers
//! is a definitive failure.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{EnrichError, Result};
use crate::rdap::{self, RegistryLookup};
use crate::record::EnrichmentRecord;
use crate::registry::{RegistryDirectory, SERVICE_TIERS};
use crate::retry::{Disposition, RetryPolicy};
use crate::tracker::{Clearance, ServerStateTracker};

#[derive(Clone)]
pub struct DomainResolver {
    directory: Arc<RegistryDirectory>,
    tracker: Arc<ServerStateTracker>,
    client: Arc<dyn RegistryLookup>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for DomainResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainResolver")
            .field("tracker", &self.tracker)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl DomainResolver {
    pub fn new(
        directory: Arc<RegistryDirectory>,
        tracker: Arc<ServerStateTracker>,
        client: Arc<dyn RegistryLookup>,
    ) -> Self {
        Self {
            directory,
            tracker,
            client,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the number of attempts per service tier.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.policy = self.policy.with_max_attempts(attempts);
        self
    }

    pub fn tracker(&self) -> &Arc<ServerStateTracker> {
        &self.tracker
    }

    pub fn directory(&self) -> &Arc<RegistryDirectory> {
        &self.directory
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolves `domain` to an enrichment record.
    ///
    /// Fails with [`EnrichError::Exhausted`] once every tier has been tried, or
    /// [`EnrichError::Cancelled`] if `cancel` fires at a suspension point.
    #[instrument(skip(self, cancel), fields(domain = %domain))]
    pub async fn resolve(&self, domain: &str, cancel: &CancellationToken) -> Result<EnrichmentRecord> {
        let mut fallback_index = 0;
        let mut last_error = String::from("no registry service was available");
        let mut tried: Vec<&str> = Vec::with_capacity(SERVICE_TIERS);

        'tiers: while let Some(service_url) = self.directory.resolve_service_url(domain, fallback_index) {
            if cancel.is_cancelled() {
                return Err(EnrichError::Cancelled(domain.to_string()));
            }

            if tried.contains(&service_url) {
                debug!(service = %service_url, tier = fallback_index, "Skipping service already tried");
                fallback_index += 1;
                continue;
            }
            tried.push(service_url);

            if self.tracker.is_rate_limited(service_url) {
                debug!(service = %service_url, tier = fallback_index, "Skipping service in cooldown");
                last_error = format!("{} is cooling down after rate limiting", service_url);
                fallback_index += 1;
                continue;
            }

            let mut attempt = 0;
            loop {
                let clearance =
                    until_cancelled(cancel, domain, self.tracker.wait_before_request(service_url)).await?;
                if clearance == Clearance::CoolingDown {
                    debug!(service = %service_url, tier = fallback_index, "Service rate limited while waiting");
                    last_error = format!("{} is cooling down after rate limiting", service_url);
                    fallback_index += 1;
                    continue 'tiers;
                }

                let outcome =
                    until_cancelled(cancel, domain, self.client.request(service_url, domain)).await?;

                let error = match outcome {
                    Ok(response) => {
                        info!(service = %service_url, tier = fallback_index, attempt, "Registry lookup succeeded");
                        return Ok(rdap::parse(&response));
                    }
                    Err(error) => error,
                };

                last_error = format!("{}: {}", service_url, error);

                match self.policy.disposition(&error, attempt) {
                    Disposition::Retry { backoff } => {
                        debug!(
                            service = %service_url,
                            attempt = attempt + 1,
                            max_attempts = self.policy.max_attempts,
                            backoff_ms = backoff.map(|d| d.as_millis() as u64).unwrap_or(0),
                            error = %error,
                            "Retrying registry lookup"
                        );
                        if let Some(delay) = backoff {
                            until_cancelled(cancel, domain, tokio::time::sleep(delay)).await?;
                        }
                        attempt += 1;
                    }
                    Disposition::NextTier { mark_rate_limited } => {
                        if mark_rate_limited {
                            self.tracker.mark_rate_limited(service_url);
                        }
                        warn!(
                            service = %service_url,
                            tier = fallback_index,
                            error = %error,
                            "Registry service failed, trying next tier"
                        );
                        fallback_index += 1;
                        continue 'tiers;
                    }
                }
            }
        }

        warn!(last_error = %last_error, "All registry services exhausted");
        Err(EnrichError::Exhausted {
            domain: domain.to_string(),
            last_error,
        })
    }
}

async fn until_cancelled<F: Future>(cancel: &CancellationToken, domain: &str, fut: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EnrichError::Cancelled(domain.to_string())),
        output = fut => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::testing::{registrant_response, test_directory, ScriptedLookup, FB1, FB2, FB3, SVC_COM};
    use std::time::Duration;
    use tokio::time::Instant;

    fn resolver(lookup: Arc<ScriptedLookup>) -> DomainResolver {
        DomainResolver::new(
            Arc::new(test_directory()),
            Arc::new(ServerStateTracker::new()),
            lookup,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_success_makes_one_call() {
        let lookup = Arc::new(ScriptedLookup::new());
        lookup.push(SVC_COM, "a.com", Ok(registrant_response("Owner A")));

        let record = resolver(lookup.clone())
            .resolve("a.com", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.registrant.name.as_deref(), Some("Owner A"));
        assert_eq!(lookup.services_called(), vec![SVC_COM]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_everywhere_stops_after_four_requests() {
        let lookup = Arc::new(ScriptedLookup::failing(LookupError::Forbidden));

        let err = resolver(lookup.clone())
            .resolve("a.com", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EnrichError::Exhausted { .. }));
        assert_eq!(lookup.services_called(), vec![SVC_COM, FB1, FB2, FB3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_back_off_then_escalate() {
        let lookup = Arc::new(ScriptedLookup::new());
        for _ in 0..3 {
            lookup.push(SVC_COM, "a.com", Err(LookupError::ServerError(503)));
        }
        lookup.push(FB1, "a.com", Ok(registrant_response("Owner A")));

        let start = Instant::now();
        let record = resolver(lookup.clone())
            .resolve("a.com", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.registrant.name.as_deref(), Some("Owner A"));
        assert_eq!(lookup.services_called(), vec![SVC_COM, SVC_COM, SVC_COM, FB1]);

        let calls = lookup.call_times();
        // Backoff (5s, then 10s) dominates the 2s pacing delay.
        assert_eq!(calls[0] - start, Duration::ZERO);
        assert_eq!(calls[1] - calls[0], Duration::from_secs(5));
        assert_eq!(calls[2] - calls[1], Duration::from_secs(10));
        // Fallback service has never been contacted, so no pacing applies.
        assert_eq!(calls[3] - calls[2], Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_retry_without_backoff() {
        let lookup = Arc::new(ScriptedLookup::new());
        lookup.push(SVC_COM, "a.com", Err(LookupError::Other("timeout".into())));
        lookup.push(SVC_COM, "a.com", Ok(registrant_response("Owner A")));

        resolver(lookup.clone())
            .resolve("a.com", &CancellationToken::new())
            .await
            .unwrap();

        let calls = lookup.call_times();
        assert_eq!(calls.len(), 2);
        // Only the pacing delay separates the attempts.
        assert_eq!(calls[1] - calls[0], Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_marks_service_and_falls_back() {
        let lookup = Arc::new(ScriptedLookup::new());
        lookup.push(SVC_COM, "a.com", Err(LookupError::RateLimited));
        lookup.push(FB1, "a.com", Ok(registrant_response("Owner A")));

        let resolver = resolver(lookup.clone());
        resolver
            .resolve("a.com", &CancellationToken::new())
            .await
            .unwrap();

        assert!(resolver.tracker().is_rate_limited(SVC_COM));
        assert!(!resolver.tracker().is_rate_limited(FB1));
        assert_eq!(lookup.services_called(), vec![SVC_COM, FB1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooling_service_is_skipped_without_request() {
        let lookup = Arc::new(ScriptedLookup::new());
        lookup.push(FB1, "b.com", Ok(registrant_response("Owner B")));

        let resolver = resolver(lookup.clone());
        resolver.tracker().mark_rate_limited(SVC_COM);
        resolver
            .resolve("b.com", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(lookup.services_called(), vec![FB1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_skipped_when_service_cools_during_backoff() {
        let lookup = Arc::new(ScriptedLookup::new());
        lookup.push(SVC_COM, "a.com", Err(LookupError::ServerError(503)));
        lookup.push(FB1, "a.com", Ok(registrant_response("Owner A")));

        let resolver = resolver(lookup.clone());
        let marker = {
            let tracker = resolver.tracker().clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                tracker.mark_rate_limited(SVC_COM);
            })
        };

        resolver
            .resolve("a.com", &CancellationToken::new())
            .await
            .unwrap();
        marker.await.unwrap();

        assert_eq!(lookup.services_called(), vec![SVC_COM, FB1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_builtin_directory_never_repeats_a_service() {
        let lookup = Arc::new(ScriptedLookup::failing(LookupError::Forbidden));
        let resolver = DomainResolver::new(
            Arc::new(RegistryDirectory::builtin()),
            Arc::new(ServerStateTracker::new()),
            lookup.clone(),
        );

        let err = resolver
            .resolve("example.zz", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EnrichError::Exhausted { .. }));
        assert_eq!(
            lookup.services_called(),
            vec!["https://rdap.org/", "https://rdap.net/", "https://rdap.iana.org/"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_configurable() {
        let lookup = Arc::new(ScriptedLookup::failing(LookupError::ServerError(500)));

        resolver(lookup.clone())
            .with_max_attempts(2)
            .resolve("a.com", &CancellationToken::new())
            .await
            .unwrap_err();

        // Two attempts on each of the four tiers.
        assert_eq!(lookup.call_times().len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let lookup = Arc::new(ScriptedLookup::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = resolver(lookup.clone()).resolve("a.com", &cancel).await.unwrap_err();

        assert!(matches!(err, EnrichError::Cancelled(_)));
        assert!(lookup.services_called().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let lookup = Arc::new(ScriptedLookup::failing(LookupError::ServerError(500)));
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                cancel.cancel();
            })
        };

        let err = resolver(lookup.clone()).resolve("a.com", &cancel).await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, EnrichError::Cancelled(_)));
        assert_eq!(lookup.call_times().len(), 1);
    }
}
