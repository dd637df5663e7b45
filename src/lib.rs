// src/lib.rs
//! Client-side DNS-driven endpoint selection.
//!
//! A [`RoundRobinBalancer`] resolves a hostname (A/AAAA) or an SRV record set,
//! keeps the result fresh from a background task, and hands out endpoints in
//! round-robin order. [`proxy::BalancedLayer`] plugs it into a tower/hyper
//! client stack.
pub mod config;
pub mod load_balancer;
pub mod metrics;
pub mod proxy;
pub mod resolver;

pub use load_balancer::{
    create_direct, create_direct_with_options, create_load_balancer, create_srv, BalancerError,
    BalancerOptions, Endpoint, LoadBalancer, RoundRobinBalancer,
};
pub use resolver::{DnsLookup, ResolutionError, Resolve};
