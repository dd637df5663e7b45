// src/resolver/direct.rs
use super::{lookup_failed, with_timeout, DnsLookup, Resolve, ResolutionError};
use crate::load_balancer::Endpoint;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Resolves a hostname and pairs every address with a fixed port.
pub struct DirectResolver {
    name: String,
    port: u16,
    lookup: Arc<dyn DnsLookup>,
}

impl DirectResolver {
    pub fn new(name: impl Into<String>, port: u16, lookup: Arc<dyn DnsLookup>) -> Self {
        Self {
            name: name.into(),
            port,
            lookup,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[async_trait]
impl Resolve for DirectResolver {
    async fn resolve(&self, timeout: Duration) -> Result<Vec<Endpoint>, ResolutionError> {
        let addresses = with_timeout(&self.name, timeout, async {
            self.lookup
                .lookup_ip(&self.name)
                .await
                .map_err(lookup_failed(&self.name))
        })
        .await?;

        Ok(addresses
            .into_iter()
            .map(|address| Endpoint::new(address, self.port))
            .collect())
    }

    fn target(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{BoxError, SrvRecord, StaticLookup};
    use std::net::IpAddr;

    struct HangingLookup;

    #[async_trait]
    impl DnsLookup for HangingLookup {
        async fn lookup_ip(&self, _host: &str) -> Result<Vec<IpAddr>, BoxError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec!["10.0.0.1".parse()?])
        }

        async fn lookup_srv(&self, _query: &str) -> Result<Vec<SrvRecord>, BoxError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_pairs_every_address_with_port() {
        let lookup = StaticLookup::new().with_host(
            "backend.internal",
            ["10.0.0.1".parse::<IpAddr>().unwrap(), "10.0.0.2".parse().unwrap()],
        );
        let resolver = DirectResolver::new("backend.internal", 80, Arc::new(lookup));

        let endpoints = resolver.resolve(Duration::from_secs(1)).await.unwrap();
        let rendered: Vec<String> = endpoints.iter().map(|e| e.to_string()).collect();

        assert_eq!(rendered, vec!["10.0.0.1:80", "10.0.0.2:80"]);
    }

    #[tokio::test]
    async fn test_lookup_failure_carries_name() {
        let resolver = DirectResolver::new("missing.internal", 80, Arc::new(StaticLookup::new()));

        let err = resolver.resolve(Duration::from_secs(1)).await.unwrap_err();

        assert!(matches!(err, ResolutionError::Lookup { .. }));
        assert_eq!(err.name(), "missing.internal");
        assert!(err.to_string().contains("missing.internal"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_bounded_by_timeout() {
        let resolver = DirectResolver::new("slow.internal", 80, Arc::new(HangingLookup));

        let err = resolver
            .resolve(Duration::from_millis(250))
            .await
            .unwrap_err();

        match err {
            ResolutionError::Timeout { name, timeout } => {
                assert_eq!(name, "slow.internal");
                assert_eq!(timeout, Duration::from_millis(250));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
