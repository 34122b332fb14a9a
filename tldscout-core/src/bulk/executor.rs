use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::progress::{ProgressCallback, ProgressSnapshot, ProgressTracker};
use crate::error::{EnrichError, Result};
use crate::rdap::{RdapClient, RegistryLookup};
use crate::record::DomainResult;
use crate::registry::RegistryDirectory;
use crate::resolver::DomainResolver;
use crate::retry::RetryPolicy;
use crate::tracker::{ServerStateTracker, ServiceStatus};
use crate::validation::{normalize_domain, tld_of};

/// Pacing knobs for one batch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Domains of one TLD looked up at the same time.
    pub concurrent_per_partition: usize,
    /// Pause between consecutive batches of the same TLD.
    pub delay_between_batches: Duration,
    /// Attempts per service tier for each domain.
    pub retries_per_domain: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrent_per_partition: 3,
            delay_between_batches: Duration::from_millis(1000),
            retries_per_domain: 2,
        }
    }
}

impl BatchOptions {
    pub fn validate(&self) -> Result<()> {
        if self.concurrent_per_partition == 0 {
            return Err(EnrichError::InvalidConfig(
                "concurrent_per_partition must be at least 1".to_string(),
            ));
        }
        if self.retries_per_domain == 0 {
            return Err(EnrichError::InvalidConfig(
                "retries_per_domain must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentReport {
    pub results: HashMap<String, DomainResult>,
    pub progress: ProgressSnapshot,
}

impl EnrichmentReport {
    pub fn successes(&self) -> impl Iterator<Item = &DomainResult> {
        self.results.values().filter(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &DomainResult> {
        self.results.values().filter(|r| !r.success)
    }
}

/// Enriches batches of domains against their registries.
///
/// Domains are grouped by TLD. Each group is worked through in batches of
/// `concurrent_per_partition`, one batch at a time with a pause in between;
/// all groups progress concurrently.
#[derive(Debug, Clone)]
pub struct BatchEnricher {
    resolver: DomainResolver,
    options: BatchOptions,
}

impl BatchEnricher {
    /// Enricher over the built-in directory and a default HTTP client.
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(
            Arc::new(RegistryDirectory::builtin()),
            Arc::new(ServerStateTracker::new()),
            Arc::new(RdapClient::new()?),
        ))
    }

    pub fn with_client(
        directory: Arc<RegistryDirectory>,
        tracker: Arc<ServerStateTracker>,
        client: Arc<dyn RegistryLookup>,
    ) -> Self {
        Self {
            resolver: DomainResolver::new(directory, tracker, client),
            options: BatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.options.concurrent_per_partition = concurrency.max(1);
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.options.delay_between_batches = delay;
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.options.retries_per_domain = retries.max(1);
        self
    }

    /// Backoff schedule for server errors. The attempt budget always comes
    /// from [`BatchOptions::retries_per_domain`].
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.resolver = self.resolver.with_retry_policy(policy);
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub fn tracker(&self) -> &Arc<ServerStateTracker> {
        self.resolver.tracker()
    }

    pub fn directory(&self) -> &Arc<RegistryDirectory> {
        self.resolver.directory()
    }

    /// Rate-limit status of every service contacted so far.
    pub fn status_report(&self) -> Vec<ServiceStatus> {
        self.tracker().status_report()
    }

    /// Enriches `domains` and returns the results with final counters.
    pub async fn enrich(&self, domains: &[String]) -> Result<EnrichmentReport> {
        let progress = ProgressTracker::new();
        let results = self
            .enrich_with(domains, &progress, &CancellationToken::new(), None)
            .await?;

        Ok(EnrichmentReport {
            results,
            progress: progress.snapshot(),
        })
    }

    /// Enriches `domains`, updating `progress` as each domain completes.
    ///
    /// Individual lookup failures never fail the call; they become
    /// unsuccessful [`DomainResult`]s. Only invalid options are errors. After
    /// `cancel` fires, remaining domains finish immediately as cancelled.
    #[instrument(skip_all, fields(domains = domains.len()))]
    pub async fn enrich_with(
        &self,
        domains: &[String],
        progress: &ProgressTracker,
        cancel: &CancellationToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<HashMap<String, DomainResult>> {
        self.options.validate()?;

        let resolver = self
            .resolver
            .clone()
            .with_max_attempts(self.options.retries_per_domain);

        let mut seen = HashSet::new();
        let mut invalid = Vec::new();
        let mut partitions: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for raw in domains {
            match normalize_domain(raw) {
                Ok(domain) => {
                    if !seen.insert(domain.clone()) {
                        continue;
                    }
                    // normalize_domain guarantees a dot, so a TLD exists.
                    let tld = tld_of(&domain).unwrap_or_default();
                    partitions.entry(tld).or_default().push(domain);
                }
                Err(e) => {
                    if !seen.insert(raw.clone()) {
                        continue;
                    }
                    warn!(domain = %raw, error = %e, "Skipping invalid domain");
                    invalid.push(DomainResult::failure(raw.clone(), e.to_string()));
                }
            }
        }

        // The full total is known before the first callback fires.
        progress.add_total(invalid.len() + partitions.values().map(Vec::len).sum::<usize>());

        let mut results = HashMap::new();
        for failure in invalid {
            let processed = progress.record_failure();
            notify(on_progress, processed, progress.total(), &failure.domain);
            results.insert(failure.domain.clone(), failure);
        }

        info!(
            total = progress.total(),
            partitions = partitions.len(),
            concurrency = self.options.concurrent_per_partition,
            "Starting registry enrichment"
        );

        let partition_results = join_all(partitions.into_iter().map(|(tld, domains)| {
            self.run_partition(&resolver, tld, domains, progress, cancel, on_progress)
        }))
        .await;

        for result in partition_results.into_iter().flatten() {
            results.insert(result.domain.clone(), result);
        }

        let snapshot = progress.snapshot();
        info!(
            successful = snapshot.successful,
            failed = snapshot.failed,
            "Registry enrichment complete"
        );

        Ok(results)
    }

    async fn run_partition(
        &self,
        resolver: &DomainResolver,
        tld: String,
        domains: Vec<String>,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Vec<DomainResult> {
        let batch_size = self.options.concurrent_per_partition;
        let mut results = Vec::with_capacity(domains.len());

        for (index, batch) in domains.chunks(batch_size).enumerate() {
            if index > 0 && !self.options.delay_between_batches.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = sleep(self.options.delay_between_batches) => {}
                }
            }

            debug!(tld = %tld, batch = index, size = batch.len(), "Running batch");

            let batch_results = join_all(
                batch
                    .iter()
                    .map(|domain| resolve_one(resolver, domain, progress, cancel, on_progress)),
            )
            .await;
            results.extend(batch_results);
        }

        results
    }
}

async fn resolve_one(
    resolver: &DomainResolver,
    domain: &str,
    progress: &ProgressTracker,
    cancel: &CancellationToken,
    on_progress: Option<&ProgressCallback>,
) -> DomainResult {
    let (result, processed) = match resolver.resolve(domain, cancel).await {
        Ok(record) => (DomainResult::success(domain, record), progress.record_success()),
        Err(e) => {
            warn!(domain = %domain, error = %e, "Registry enrichment failed");
            (DomainResult::failure(domain, e.to_string()), progress.record_failure())
        }
    };

    notify(on_progress, processed, progress.total(), domain);
    result
}

fn notify(callback: Option<&ProgressCallback>, processed: usize, total: usize, domain: &str) {
    if let Some(callback) = callback {
        callback(processed, total, domain);
    }
}

pub fn parse_domains_from_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            // Handle CSV format (take first column)
            line.split(',').next().unwrap_or(line).trim().to_string()
        })
        .filter(|domain| domain.contains('.'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::testing::{registrant_response, test_directory, ScriptedLookup, FB1, SVC_COM, SVC_NET};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn enricher(lookup: Arc<ScriptedLookup>) -> BatchEnricher {
        BatchEnricher::with_client(
            Arc::new(test_directory()),
            Arc::new(ServerStateTracker::new()),
            lookup,
        )
    }

    fn domains(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_domains_from_file() {
        let content = r#"
# This is a comment
example.com
  whitespace.com
invalid
csv.org,format,example
"#;

        let domains = parse_domains_from_file(content);
        assert_eq!(domains, vec!["example.com", "whitespace.com", "csv.org"]);
    }

    #[test]
    fn test_options_validation() {
        assert!(BatchOptions::default().validate().is_ok());
        let bad = BatchOptions {
            concurrent_per_partition: 0,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(EnrichError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input() {
        let lookup = Arc::new(ScriptedLookup::succeeding());
        let report = enricher(lookup.clone()).enrich(&[]).await.unwrap();

        assert!(report.results.is_empty());
        assert_eq!(report.progress, ProgressSnapshot::default());
        assert!(lookup.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_domain_recovers_on_fallback() {
        let lookup = Arc::new(ScriptedLookup::new());
        lookup.push(SVC_COM, "a.com", Ok(registrant_response("Owner A")));
        lookup.push(SVC_COM, "b.com", Err(LookupError::RateLimited));
        lookup.push(FB1, "b.com", Ok(registrant_response("Owner B")));
        lookup.push(SVC_NET, "c.net", Ok(registrant_response("Owner C")));

        let enricher = enricher(lookup.clone());
        let report = enricher
            .enrich(&domains(&["a.com", "b.com", "c.net"]))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 3);
        assert!(report.results.values().all(|r| r.success));
        assert_eq!(
            report.results["b.com"].data.as_ref().unwrap().registrant.name.as_deref(),
            Some("Owner B")
        );

        let svc_com = enricher
            .status_report()
            .into_iter()
            .find(|s| s.service_url == SVC_COM)
            .unwrap();
        assert!(svc_com.rate_limited);
        assert!(svc_com.remaining_cooldown_seconds > 0);

        assert_eq!(
            report.progress,
            ProgressSnapshot {
                total: 3,
                processed: 3,
                successful: 3,
                failed: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_abort_batch() {
        let lookup = Arc::new(ScriptedLookup::failing(LookupError::Forbidden));
        lookup.push(SVC_NET, "ok.net", Ok(registrant_response("Owner")));

        let report = enricher(lookup)
            .enrich(&domains(&["x.com", "y.com", "ok.net", "not a domain"]))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 4);
        assert_eq!(report.successes().count(), 1);
        assert_eq!(report.failures().count(), 3);
        assert!(report.results["x.com"].error.as_deref().unwrap().contains("exhausted"));
        assert!(report.results["not a domain"].data.is_none());
        assert_eq!(report.progress.processed, report.progress.total);
        assert_eq!(
            report.progress.processed,
            report.progress.successful + report.progress.failed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_are_looked_up_once() {
        let lookup = Arc::new(ScriptedLookup::succeeding());
        let report = enricher(lookup.clone())
            .enrich(&domains(&["a.com", "A.COM", "https://www.a.com/"]))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.progress.total, 1);
        assert_eq!(lookup.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_within_partition_are_sequential() {
        let lookup = Arc::new(ScriptedLookup::succeeding());
        let enricher = enricher(lookup.clone())
            .with_concurrency(2)
            .with_batch_delay(Duration::from_secs(1));

        let start = Instant::now();
        enricher
            .enrich(&domains(&["a.com", "b.com", "c.com", "d.com", "e.com"]))
            .await
            .unwrap();

        // One shared service: pacing spaces every request by 2s. The 1s batch
        // pause overlaps pacing, so five requests land at 0, 2, 4, 6, 8s.
        let mut offsets: Vec<u64> = lookup
            .call_times()
            .iter()
            .map(|t| (*t - start).as_secs())
            .collect();
        offsets.sort_unstable();
        assert_eq!(offsets, vec![0, 2, 4, 6, 8]);

        // Batch order: [a, b] before [c, d] before [e].
        let order: Vec<String> = lookup.calls().into_iter().map(|c| c.domain).collect();
        let pos = |d: &str| order.iter().position(|x| x == d).unwrap();
        assert!(pos("a.com").max(pos("b.com")) < pos("c.com").min(pos("d.com")));
        assert!(pos("c.com").max(pos("d.com")) < pos("e.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partitions_run_concurrently() {
        let lookup = Arc::new(ScriptedLookup::succeeding());
        let enricher = enricher(lookup.clone()).with_concurrency(1);

        let start = Instant::now();
        enricher
            .enrich(&domains(&["a.com", "b.net", "c.org"]))
            .await
            .unwrap();

        // Three different services: nobody waits on anybody.
        assert!(lookup.call_times().iter().all(|t| *t == start));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_callback_sees_every_domain() {
        let lookup = Arc::new(ScriptedLookup::succeeding());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let callback: ProgressCallback = {
            let seen = seen.clone();
            Box::new(move |processed, total, domain| {
                seen.lock().unwrap().push((processed, total, domain.to_string()));
            })
        };

        let progress = ProgressTracker::new();
        enricher(lookup)
            .enrich_with(
                &domains(&["a.com", "b.net"]),
                &progress,
                &CancellationToken::new(),
                Some(&callback),
            )
            .await
            .unwrap();

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.iter().map(|s| s.0).collect::<Vec<_>>(), vec![1, 2]);
        assert!(seen.iter().all(|s| s.1 == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_total_is_stable_with_invalid_input() {
        let lookup = Arc::new(ScriptedLookup::succeeding());
        let totals = Arc::new(Mutex::new(Vec::new()));
        let callback: ProgressCallback = {
            let totals = totals.clone();
            Box::new(move |_, total, _| totals.lock().unwrap().push(total))
        };

        enricher(lookup)
            .enrich_with(
                &domains(&["bad input", "a.com", "b.net", "also bad"]),
                &ProgressTracker::new(),
                &CancellationToken::new(),
                Some(&callback),
            )
            .await
            .unwrap();

        assert_eq!(*totals.lock().unwrap(), vec![4, 4, 4, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_request_reaches_service_after_rate_limit() {
        let lookup = Arc::new(ScriptedLookup::succeeding().with_latency(Duration::from_millis(500)));
        lookup.push(SVC_COM, "a.com", Err(LookupError::RateLimited));

        let enricher = enricher(lookup.clone());
        let report = enricher
            .enrich(&domains(&["a.com", "b.com", "c.com"]))
            .await
            .unwrap();

        assert!(report.results.values().all(|r| r.success));

        let calls = lookup.calls();
        let to_primary: Vec<&str> = calls
            .iter()
            .filter(|c| c.service_url == SVC_COM)
            .map(|c| c.domain.as_str())
            .collect();
        assert_eq!(to_primary, vec!["a.com"]);
        assert!(calls
            .iter()
            .filter(|c| c.domain != "a.com")
            .all(|c| c.service_url == FB1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_reports_every_domain() {
        let lookup = Arc::new(ScriptedLookup::succeeding());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let progress = ProgressTracker::new();
        let results = enricher(lookup.clone())
            .enrich_with(&domains(&["a.com", "b.com"]), &progress, &cancel, None)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.values().all(|r| !r.success));
        assert!(lookup.calls().is_empty());
        assert!(progress.snapshot().is_complete());
    }

    #[tokio::test]
    async fn test_invalid_options_are_errors() {
        let lookup = Arc::new(ScriptedLookup::succeeding());
        let enricher = enricher(lookup).with_options(BatchOptions {
            retries_per_domain: 0,
            ..Default::default()
        });

        let err = enricher.enrich(&domains(&["a.com"])).await.unwrap_err();
        assert!(matches!(err, EnrichError::InvalidConfig(_)));
    }
}
