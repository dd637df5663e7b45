// src/resolver/system.rs
use super::{BoxError, DnsLookup, SrvRecord};
use async_trait::async_trait;
use hickory_resolver::error::ResolveError;
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;

/// Lookups against the resolvers configured for this host
/// (`/etc/resolv.conf` on unix).
///
/// Record TTLs are not used; freshness comes from the balancer's refresh
/// interval.
#[derive(Clone)]
pub struct SystemLookup {
    resolver: TokioAsyncResolver,
}

impl SystemLookup {
    pub fn from_system_conf() -> Result<Self, ResolveError> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()?;
        Ok(Self { resolver })
    }

    pub fn from_resolver(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl DnsLookup for SystemLookup {
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, BoxError> {
        let lookup = self.resolver.lookup_ip(host).await?;
        Ok(lookup.iter().collect())
    }

    async fn lookup_srv(&self, query: &str) -> Result<Vec<SrvRecord>, BoxError> {
        let lookup = self.resolver.srv_lookup(query).await?;
        Ok(lookup
            .iter()
            .map(|srv| SrvRecord::new(srv.target().to_utf8(), srv.port()))
            .collect())
    }
}
