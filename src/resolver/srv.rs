// src/resolver/srv.rs
use super::{
    lookup_failed, with_timeout, DnsLookup, PartialResolutionError, Resolve, ResolutionError,
};
use crate::load_balancer::Endpoint;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Builds `_service._proto.domain`. With no service and proto the domain is
/// queried as given.
pub fn srv_query_name(service: &str, proto: &str, domain: &str) -> String {
    if service.is_empty() && proto.is_empty() {
        return domain.to_string();
    }
    format!("{}.{}.{}", underscored(service), underscored(proto), domain)
}

fn underscored(label: &str) -> String {
    if label.starts_with('_') {
        label.to_string()
    } else {
        format!("_{}", label)
    }
}

#[derive(Debug)]
pub struct SrvResolution {
    pub endpoints: Vec<Endpoint>,
    pub partial: Option<PartialResolutionError>,
}

/// Resolves an SRV record set, then every target's addresses, using each
/// record's own port.
pub struct SrvResolver {
    query: String,
    lookup: Arc<dyn DnsLookup>,
}

impl SrvResolver {
    pub fn new(service: &str, proto: &str, domain: &str, lookup: Arc<dyn DnsLookup>) -> Self {
        Self {
            query: srv_query_name(service, proto, domain),
            lookup,
        }
    }

    /// Like [`Resolve::resolve`], but hands back per-target failures when at
    /// least one target resolved.
    ///
    /// `timeout` bounds the SRV query; targets are then looked up concurrently,
    /// each bounded by whatever is left of it. A target that runs out of time
    /// counts as a failed target, not as a failure of the whole lookup.
    pub async fn resolve_detailed(&self, timeout: Duration) -> Result<SrvResolution, ResolutionError> {
        let start = Instant::now();
        let records = with_timeout(&self.query, timeout, async {
            self.lookup
                .lookup_srv(&self.query)
                .await
                .map_err(lookup_failed(&self.query))
        })
        .await?;

        let remaining = timeout.saturating_sub(start.elapsed());
        let results = join_all(records.iter().map(|record| {
            with_timeout(&record.target, remaining, async move {
                self.lookup
                    .lookup_ip(&record.target)
                    .await
                    .map_err(lookup_failed(&record.target))
            })
        }))
        .await;

        let mut endpoints = Vec::new();
        let mut first_error = None;
        let mut failed = 0;

        for (record, result) in records.iter().zip(results) {
            match result {
                Ok(addresses) => endpoints.extend(
                    addresses
                        .into_iter()
                        .map(|address| Endpoint::new(address, record.port)),
                ),
                Err(e) => {
                    failed += 1;
                    debug!("SRV target {} for {} failed: {}", record.target, self.query, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(first) if endpoints.is_empty() => Err(first),
            Some(first) => Ok(SrvResolution {
                endpoints,
                partial: Some(PartialResolutionError {
                    query: self.query.clone(),
                    failed,
                    total: records.len(),
                    first,
                }),
            }),
            None => Ok(SrvResolution {
                endpoints,
                partial: None,
            }),
        }
    }
}

#[async_trait]
impl Resolve for SrvResolver {
    async fn resolve(&self, timeout: Duration) -> Result<Vec<Endpoint>, ResolutionError> {
        let resolution = self.resolve_detailed(timeout).await?;
        if let Some(partial) = &resolution.partial {
            warn!("Serving partial SRV result: {}", partial);
        }
        Ok(resolution.endpoints)
    }

    fn target(&self) -> &str {
        &self.query
    }
}
