//! Per-service pacing and rate-limit bookkeeping.
//!
//! Every registry service URL gets one [`ServiceState`]. Requests to the same
//! URL are paced by an adaptive delay and serialized by a per-URL async lock,
//! so tasks targeting different services never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_PENALTY_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Mutable state for one registry service URL.
#[derive(Debug, Clone)]
pub struct ServiceState {
    pub service_url: String,
    pub last_request_at: Option<Instant>,
    pub rate_limited: bool,
    pub cooldown_until: Option<Instant>,
    pub marked_at: Option<Instant>,
}

impl ServiceState {
    fn new(service_url: &str) -> Self {
        Self {
            service_url: service_url.to_string(),
            last_request_at: None,
            rate_limited: false,
            cooldown_until: None,
            marked_at: None,
        }
    }

    /// Clears an elapsed cooldown and reports whether one is still active.
    fn refresh_cooldown(&mut self, now: Instant) -> bool {
        if !self.rate_limited {
            return false;
        }
        match self.cooldown_until {
            Some(until) if now < until => true,
            _ => {
                debug!(service = %self.service_url, "Rate-limit cooldown expired");
                self.rate_limited = false;
                self.cooldown_until = None;
                false
            }
        }
    }

    fn remaining_cooldown(&self, now: Instant) -> Duration {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or_default()
    }
}

/// Diagnostic view of one service, as returned by [`ServerStateTracker::status_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub service_url: String,
    pub rate_limited: bool,
    pub remaining_cooldown_seconds: u64,
}

/// Outcome of [`ServerStateTracker::wait_before_request`].
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clearance {
    /// The request may be sent now.
    Granted,
    /// The service is in a rate-limit cooldown.
    CoolingDown,
}

struct ServiceSlot {
    state: Mutex<ServiceState>,
    // Held across the pacing sleep so stamps for one URL are strictly ordered.
    pacing: tokio::sync::Mutex<()>,
}

/// Shared registry of [`ServiceState`]s, one per service URL.
pub struct ServerStateTracker {
    slots: Mutex<HashMap<String, Arc<ServiceSlot>>>,
    base_delay: Duration,
    default_cooldown: Duration,
    penalty_window: Duration,
}

impl std::fmt::Debug for ServerStateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerStateTracker")
            .field("services", &lock(&self.slots).len())
            .field("base_delay", &self.base_delay)
            .field("default_cooldown", &self.default_cooldown)
            .field("penalty_window", &self.penalty_window)
            .finish()
    }
}

impl Default for ServerStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerStateTracker {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            base_delay: DEFAULT_BASE_DELAY,
            default_cooldown: DEFAULT_COOLDOWN,
            penalty_window: DEFAULT_PENALTY_WINDOW,
        }
    }

    /// Sets the minimum spacing between requests to one service.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the cooldown applied by [`mark_rate_limited`](Self::mark_rate_limited).
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.default_cooldown = cooldown;
        self
    }

    /// Sets how long after a 429 the pacing delay stays doubled.
    pub fn with_penalty_window(mut self, window: Duration) -> Self {
        self.penalty_window = window;
        self
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    fn slot(&self, service_url: &str) -> Arc<ServiceSlot> {
        let mut slots = lock(&self.slots);
        slots
            .entry(service_url.to_string())
            .or_insert_with(|| {
                Arc::new(ServiceSlot {
                    state: Mutex::new(ServiceState::new(service_url)),
                    pacing: tokio::sync::Mutex::new(()),
                })
            })
            .clone()
    }

    fn existing_slot(&self, service_url: &str) -> Option<Arc<ServiceSlot>> {
        lock(&self.slots).get(service_url).cloned()
    }

    /// True while a recorded cooldown for `service_url` has not elapsed.
    pub fn is_rate_limited(&self, service_url: &str) -> bool {
        match self.existing_slot(service_url) {
            Some(slot) => lock(&slot.state).refresh_cooldown(Instant::now()),
            None => false,
        }
    }

    /// Starts the default cooldown for `service_url`.
    pub fn mark_rate_limited(&self, service_url: &str) {
        self.mark_rate_limited_for(service_url, self.default_cooldown);
    }

    /// Starts a cooldown of `cooldown` for `service_url`. An existing longer
    /// cooldown is kept.
    pub fn mark_rate_limited_for(&self, service_url: &str, cooldown: Duration) {
        let slot = self.slot(service_url);
        let mut state = lock(&slot.state);
        let now = Instant::now();
        let until = now + cooldown;

        state.rate_limited = true;
        state.cooldown_until = Some(match state.cooldown_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
        state.marked_at = Some(now);

        warn!(
            service = %service_url,
            cooldown_secs = cooldown.as_secs(),
            "Registry service rate limited, cooling down"
        );
    }

    /// Delay currently enforced between two requests to `service_url`.
    pub fn adaptive_delay(&self, service_url: &str) -> Duration {
        match self.existing_slot(service_url) {
            Some(slot) => self.delay_for(&lock(&slot.state), Instant::now()),
            None => self.base_delay,
        }
    }

    fn delay_for(&self, state: &ServiceState, now: Instant) -> Duration {
        let recently_throttled = state
            .marked_at
            .is_some_and(|marked| now.saturating_duration_since(marked) < self.penalty_window);

        if recently_throttled {
            self.base_delay * 2
        } else {
            self.base_delay
        }
    }

    /// Suspends until the adaptive delay has passed since the previous request
    /// to `service_url`, then records now as the latest request time.
    ///
    /// The cooldown is checked once the caller holds its turn. If the service
    /// was rate limited while the caller waited, nothing is stamped and
    /// [`Clearance::CoolingDown`] is returned; the caller must not send.
    /// Callers for other URLs are never blocked.
    pub async fn wait_before_request(&self, service_url: &str) -> Clearance {
        let slot = self.slot(service_url);
        let _turn = slot.pacing.lock().await;

        if lock(&slot.state).refresh_cooldown(Instant::now()) {
            return Clearance::CoolingDown;
        }

        let ready_at = {
            let state = lock(&slot.state);
            state
                .last_request_at
                .map(|last| last + self.delay_for(&state, Instant::now()))
        };

        if let Some(ready_at) = ready_at {
            let now = Instant::now();
            if ready_at > now {
                debug!(
                    service = %service_url,
                    wait_ms = (ready_at - now).as_millis() as u64,
                    "Pacing request"
                );
                sleep_until(ready_at).await;
            }
        }

        let mut state = lock(&slot.state);
        let now = Instant::now();
        if state.refresh_cooldown(now) {
            debug!(service = %service_url, "Service entered cooldown while pacing");
            return Clearance::CoolingDown;
        }
        state.last_request_at = Some(now);
        Clearance::Granted
    }

    /// Snapshot of a single service's state, if it has been contacted.
    pub fn state(&self, service_url: &str) -> Option<ServiceState> {
        let slot = self.existing_slot(service_url)?;
        let mut state = lock(&slot.state);
        state.refresh_cooldown(Instant::now());
        Some(state.clone())
    }

    /// Rate-limit status of every known service, sorted by URL.
    pub fn status_report(&self) -> Vec<ServiceStatus> {
        let slots: Vec<Arc<ServiceSlot>> = lock(&self.slots).values().cloned().collect();
        let now = Instant::now();

        let mut report: Vec<ServiceStatus> = slots
            .iter()
            .map(|slot| {
                let mut state = lock(&slot.state);
                let rate_limited = state.refresh_cooldown(now);
                ServiceStatus {
                    service_url: state.service_url.clone(),
                    rate_limited,
                    remaining_cooldown_seconds: state.remaining_cooldown(now).as_secs(),
                }
            })
            .collect();

        report.sort_by(|a, b| a.service_url.cmp(&b.service_url));
        info!(services = report.len(), "Service status report");
        report
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Service state lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
