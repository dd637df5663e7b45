//
// src/proxy/mod.rs
//
mod balanced;

pub use balanced::{with_authority, BalancedLayer, BalancedService, ProxyError};
