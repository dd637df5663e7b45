// src/load_balancer/algorithm.rs
use crate::config::ConfigError;
use crate::load_balancer::Endpoint;
use crate::resolver::ResolutionError;

/// Hands out the next endpoint to use for an outbound call.
pub trait LoadBalancer: Send + Sync {
    /// Never blocks. Fails only with [`BalancerError::NoHosts`].
    fn next(&self) -> Result<Endpoint, BalancerError>;

    /// Signals background work to stop and returns immediately.
    fn close(&self);

    fn name(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum BalancerError {
    #[error("No hosts available in list")]
    NoHosts,

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Invalid balancer configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to initialise system resolver: {0}")]
    ResolverSetup(#[from] hickory_resolver::error::ResolveError),
}
