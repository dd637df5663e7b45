// src/resolver/mod.rs
//
// Turning a logical target into a list of endpoints. `DnsLookup` is the raw
// capability (hostname -> addresses, SRV name -> targets); `Resolve` is what
// the balancer drives on every refresh.
//
mod direct;
mod srv;
mod static_lookup;
mod system;

pub use direct::DirectResolver;
pub use srv::{srv_query_name, SrvResolution, SrvResolver};
pub use static_lookup::StaticLookup;
pub use system::SystemLookup;

use crate::load_balancer::Endpoint;
use async_trait::async_trait;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One entry of an SRV answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    pub target: String,
    pub port: u16,
}

impl SrvRecord {
    pub fn new(target: impl Into<String>, port: u16) -> Self {
        Self {
            target: target.into(),
            port,
        }
    }
}

#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, BoxError>;

    async fn lookup_srv(&self, query: &str) -> Result<Vec<SrvRecord>, BoxError>;
}

#[async_trait]
pub trait Resolve: Send + Sync {
    /// Resolves the configured target, bounded by `timeout`.
    async fn resolve(&self, timeout: Duration) -> Result<Vec<Endpoint>, ResolutionError>;

    /// The queried name, for logs and metric labels.
    fn target(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("Error looking up host={name}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Lookup of host={name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },
}

impl ResolutionError {
    pub fn name(&self) -> &str {
        match self {
            ResolutionError::Lookup { name, .. } | ResolutionError::Timeout { name, .. } => name,
        }
    }
}

/// Some SRV targets failed while at least one resolved.
#[derive(Debug, thiserror::Error)]
#[error("{failed} of {total} SRV targets for {query} failed to resolve, first error: {first}")]
pub struct PartialResolutionError {
    pub query: String,
    pub failed: usize,
    pub total: usize,
    #[source]
    pub first: ResolutionError,
}

pub(crate) async fn with_timeout<T, F>(
    name: &str,
    timeout: Duration,
    lookup: F,
) -> Result<T, ResolutionError>
where
    F: Future<Output = Result<T, ResolutionError>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(result) => result,
        Err(_) => Err(ResolutionError::Timeout {
            name: name.to_string(),
            timeout,
        }),
    }
}

pub(crate) fn lookup_failed(name: &str) -> impl FnOnce(BoxError) -> ResolutionError + '_ {
    move |source| ResolutionError::Lookup {
        name: name.to_string(),
        source,
    }
}
