// src/resolver/static_lookup.rs
use super::{BoxError, DnsLookup, SrvRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;

/// In-memory lookup table. Useful for fixed fleets and for tests.
///
/// Names are matched without their trailing dot. IP literals resolve to
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    hosts: HashMap<String, Vec<IpAddr>>,
    services: HashMap<String, Vec<SrvRecord>>,
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, name: &str, addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        self.hosts
            .entry(normalize(name))
            .or_default()
            .extend(addresses);
        self
    }

    pub fn with_srv(mut self, query: &str, records: impl IntoIterator<Item = SrvRecord>) -> Self {
        self.services
            .entry(normalize(query))
            .or_default()
            .extend(records);
        self
    }
}

#[async_trait]
impl DnsLookup for StaticLookup {
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, BoxError> {
        if let Ok(address) = host.parse::<IpAddr>() {
            return Ok(vec![address]);
        }
        self.hosts
            .get(&normalize(host))
            .cloned()
            .ok_or_else(|| format!("no address records for {}", host).into())
    }

    async fn lookup_srv(&self, query: &str) -> Result<Vec<SrvRecord>, BoxError> {
        self.services
            .get(&normalize(query))
            .cloned()
            .ok_or_else(|| format!("no SRV records for {}", query).into())
    }
}
