// src/load_balancer/round_robin.rs
use crate::config::RefreshConfig;
use crate::load_balancer::{endpoints_equal, BalancerError, Endpoint, LoadBalancer};
use crate::metrics::MetricsCollector;
use crate::resolver::Resolve;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Round-robin selection over an endpoint set that a background task keeps
/// in sync with DNS.
///
/// The set is an immutable snapshot behind an [`ArcSwap`]; refreshes replace
/// it wholesale and only when its members changed. `next()` loads one
/// snapshot per call and indexes into it with a shared atomic counter.
pub struct RoundRobinBalancer {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    resolver: Arc<dyn Resolve>,
    endpoints: ArcSwap<Vec<Endpoint>>,
    counter: AtomicU64,
    refresh: RefreshConfig,
    metrics: Option<Arc<MetricsCollector>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Changed,
    Unchanged,
    Failed,
    Empty,
    Discarded,
}

impl RefreshOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            RefreshOutcome::Changed => "changed",
            RefreshOutcome::Unchanged => "unchanged",
            RefreshOutcome::Failed => "failed",
            RefreshOutcome::Empty => "empty",
            RefreshOutcome::Discarded => "discarded",
        }
    }
}

impl RoundRobinBalancer {
    /// Resolves once and starts the refresh task. Fails if that first
    /// resolution fails or yields no endpoints; no task is spawned then.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn new(
        resolver: Arc<dyn Resolve>,
        refresh: RefreshConfig,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Result<Self, BalancerError> {
        refresh.validate()?;

        let initial = resolver.resolve(refresh.lookup_timeout()).await?;
        if initial.is_empty() {
            return Err(BalancerError::NoHosts);
        }

        info!(
            "Resolved {} initial endpoints for {}: {:?}",
            initial.len(),
            resolver.target(),
            initial
        );
        if let Some(metrics) = &metrics {
            metrics.update_endpoint_count(resolver.target(), initial.len());
        }

        let shared = Arc::new(Shared {
            resolver,
            endpoints: ArcSwap::from_pointee(initial),
            counter: AtomicU64::new(0),
            refresh,
            metrics,
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(shared.clone().refresh_loop(shutdown_rx));

        Ok(Self {
            shared,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        })
    }

    /// The currently published endpoint set.
    pub fn endpoints(&self) -> Arc<Vec<Endpoint>> {
        self.shared.endpoints.load_full()
    }

    pub fn target(&self) -> &str {
        self.shared.resolver.target()
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Closes the balancer and waits for the refresh task to exit.
    pub async fn shutdown(&self) {
        self.close();
        let task = match self.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Refresh task for {} ended abnormally: {}", self.target(), e);
            }
        }
    }
}

impl LoadBalancer for RoundRobinBalancer {
    fn next(&self) -> Result<Endpoint, BalancerError> {
        let endpoints = self.shared.endpoints.load();
        if endpoints.is_empty() {
            return Err(BalancerError::NoHosts);
        }

        let n = self.shared.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let index = (n % endpoints.len() as u64) as usize;
        Ok(endpoints[index])
    }

    fn close(&self) {
        // send_replace so the flag sticks even if the task already exited.
        if !self.shutdown_tx.send_replace(true) {
            debug!("Closing balancer for {}", self.target());
        }
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

impl Shared {
    async fn refresh_loop(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        let period = self.refresh.interval();
        let mut interval = interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Starting endpoint refresh for {} with interval: {:?}",
            self.resolver.target(),
            period
        );

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Endpoint refresh for {} shutting down", self.resolver.target());
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.refresh(&shutdown_rx).await;
                }
            }
        }
    }

    async fn refresh(&self, shutdown_rx: &watch::Receiver<bool>) -> RefreshOutcome {
        let target = self.resolver.target();
        let start = Instant::now();
        let result = self.resolver.resolve(self.refresh.lookup_timeout()).await;
        let elapsed = start.elapsed();

        let outcome = match result {
            Err(e) => {
                warn!("Error refreshing endpoints for {}, keeping previous set: {}", target, e);
                RefreshOutcome::Failed
            }
            Ok(next) if next.is_empty() => {
                warn!("Lookup for {} returned no endpoints, keeping previous set", target);
                RefreshOutcome::Empty
            }
            Ok(next) => {
                let current = self.endpoints.load();
                if endpoints_equal(&current, &next) {
                    debug!("Endpoints for {} unchanged", target);
                    RefreshOutcome::Unchanged
                } else if *shutdown_rx.borrow() {
                    debug!("Balancer for {} closed during refresh, discarding result", target);
                    RefreshOutcome::Discarded
                } else {
                    info!("Endpoints changed for {}: {:?}", target, next);
                    let count = next.len();
                    self.endpoints.store(Arc::new(next));
                    if let Some(metrics) = &self.metrics {
                        metrics.record_publish(target, count);
                    }
                    RefreshOutcome::Changed
                }
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_refresh(target, outcome.as_str(), elapsed);
        }
        outcome
    }
}
