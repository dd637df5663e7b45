// src/load_balancer/mod.rs
mod algorithm;
mod endpoint;
mod round_robin;

pub use algorithm::{BalancerError, LoadBalancer};
pub use endpoint::{endpoints_equal, Endpoint};
pub use round_robin::RoundRobinBalancer;

use crate::config::{RefreshConfig, TargetConfig};
use crate::metrics::MetricsCollector;
use crate::resolver::{DirectResolver, DnsLookup, Resolve, SrvResolver, SystemLookup};
use std::sync::Arc;
use std::time::Duration;

/// Construction options shared by both balancer flavours.
///
/// Defaults: system DNS, refresh every 5s, 2s lookup timeout, no metrics.
#[derive(Clone, Default)]
pub struct BalancerOptions {
    pub lookup: Option<Arc<dyn DnsLookup>>,
    pub refresh: RefreshConfig,
    pub metrics: Option<Arc<MetricsCollector>>,
}

impl BalancerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn DnsLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh.interval_ms = whole_millis(interval);
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.refresh.lookup_timeout_ms = whole_millis(timeout);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn lookup_or_system(&self) -> Result<Arc<dyn DnsLookup>, BalancerError> {
        match &self.lookup {
            Some(lookup) => Ok(lookup.clone()),
            None => Ok(Arc::new(SystemLookup::from_system_conf()?)),
        }
    }
}

/// Milliseconds for a builder duration. Sub-millisecond values round up to 1
/// and oversized ones saturate; only zero maps to zero, which validation rejects.
fn whole_millis(duration: Duration) -> u64 {
    if duration.is_zero() {
        return 0;
    }
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Balancer over `name` resolved through the system resolver, every address
/// paired with `port`.
pub async fn create_direct(
    name: &str,
    port: u16,
    refresh_interval: Duration,
    lookup_timeout: Duration,
) -> Result<RoundRobinBalancer, BalancerError> {
    let options = BalancerOptions::new()
        .with_refresh_interval(refresh_interval)
        .with_lookup_timeout(lookup_timeout);
    create_direct_with_options(name, port, options).await
}

pub async fn create_direct_with_options(
    name: &str,
    port: u16,
    options: BalancerOptions,
) -> Result<RoundRobinBalancer, BalancerError> {
    let target = TargetConfig::Direct {
        name: name.to_string(),
        port,
    };
    create_load_balancer(&target, options).await
}

/// Balancer over the SRV record set `_service._proto.domain`.
pub async fn create_srv(
    service: &str,
    proto: &str,
    domain: &str,
    options: BalancerOptions,
) -> Result<RoundRobinBalancer, BalancerError> {
    let target = TargetConfig::Srv {
        service: service.to_string(),
        proto: proto.to_string(),
        domain: domain.to_string(),
    };
    create_load_balancer(&target, options).await
}

pub async fn create_load_balancer(
    target: &TargetConfig,
    options: BalancerOptions,
) -> Result<RoundRobinBalancer, BalancerError> {
    target.validate()?;
    options.refresh.validate()?;

    let lookup = options.lookup_or_system()?;
    let resolver: Arc<dyn Resolve> = match target {
        TargetConfig::Direct { name, port } => Arc::new(DirectResolver::new(name.clone(), *port, lookup)),
        TargetConfig::Srv {
            service,
            proto,
            domain,
        } => Arc::new(SrvResolver::new(service, proto, domain, lookup)),
    };

    RoundRobinBalancer::new(resolver, options.refresh, options.metrics).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::resolver::StaticLookup;

    #[test]
    fn test_whole_millis_edges() {
        assert_eq!(whole_millis(Duration::ZERO), 0);
        assert_eq!(whole_millis(Duration::from_micros(500)), 1);
        assert_eq!(whole_millis(Duration::from_nanos(1)), 1);
        assert_eq!(whole_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(whole_millis(Duration::from_secs(1 << 62)), u64::MAX);
        assert_eq!(whole_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_builder_keeps_sub_millisecond_and_huge_durations_valid() {
        let options = BalancerOptions::new()
            .with_refresh_interval(Duration::from_secs(1 << 62))
            .with_lookup_timeout(Duration::from_micros(500));

        assert_eq!(options.refresh.interval_ms, u64::MAX);
        assert_eq!(options.refresh.lookup_timeout_ms, 1);
        assert!(options.refresh.validate().is_ok());
    }

    #[tokio::test]
    async fn test_zero_duration_still_rejected() {
        let options = BalancerOptions::new()
            .with_lookup(Arc::new(StaticLookup::new()))
            .with_lookup_timeout(Duration::ZERO);

        let result = create_direct_with_options("backend", 80, options).await;

        assert!(matches!(
            result,
            Err(BalancerError::InvalidConfig(ConfigError::ZeroDuration(_)))
        ));
    }
}
