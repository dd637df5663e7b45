// src/load_balancer/endpoint.rs
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// A resolved network destination.
///
/// Equality compares the exact address representation and the port, so an
/// IPv4 address and its IPv4-mapped IPv6 form are different endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    address: IpAddr,
    port: u16,
}

impl Endpoint {
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self { address, port }
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

// IPv6 addresses are bracketed so the output is always a valid authority.
impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.socket_addr(), f)
    }
}

/// Returns true when both slices hold the same multiset of endpoints,
/// regardless of order.
pub fn endpoints_equal(a: &[Endpoint], b: &[Endpoint]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a == b {
        return true;
    }

    let mut counts: HashMap<&Endpoint, isize> = HashMap::with_capacity(a.len());
    for endpoint in a {
        *counts.entry(endpoint).or_insert(0) += 1;
    }
    for endpoint in b {
        match counts.get_mut(endpoint) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn ep(last: u8, port: u16) -> Endpoint {
        Endpoint::new(IpAddr::V4(Ipv4Addr::new(192, 168, 0, last)), port)
    }

    #[test]
    fn test_display() {
        assert_eq!(ep(1, 123).to_string(), "192.168.0.1:123");
        assert_eq!(format!("{}", &ep(1, 123)), "192.168.0.1:123");

        let v6 = Endpoint::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 8080);
        assert_eq!(v6.to_string(), "[::1]:8080");
    }

    #[test]
    fn test_endpoint_equality() {
        assert_eq!(ep(1, 123), ep(1, 123));
        assert_ne!(ep(1, 1233), ep(1, 1234));
        assert_ne!(ep(2, 1234), ep(1, 1234));
        assert_ne!(ep(2, 1234), ep(1, 123));
    }

    #[test]
    fn test_mapped_ipv6_is_a_different_endpoint() {
        let v4 = Ipv4Addr::new(10, 0, 0, 1);
        let plain = Endpoint::new(IpAddr::V4(v4), 80);
        let mapped = Endpoint::new(IpAddr::V6(v4.to_ipv6_mapped()), 80);

        assert_ne!(plain, mapped);
        assert!(!endpoints_equal(&[plain], &[mapped]));
    }

    #[test]
    fn test_endpoints_equal() {
        let cases: Vec<(&str, Vec<Endpoint>, Vec<Endpoint>, bool)> = vec![
            ("empty lists", vec![], vec![], true),
            ("single same endpoint", vec![ep(2, 1234)], vec![ep(2, 1234)], true),
            (
                "different lengths",
                vec![ep(2, 1234), ep(1, 1234)],
                vec![ep(2, 1234)],
                false,
            ),
            (
                "identical order",
                vec![ep(1, 1234), ep(2, 1234), ep(3, 1234)],
                vec![ep(1, 1234), ep(2, 1234), ep(3, 1234)],
                true,
            ),
            (
                "scrambled addresses",
                vec![ep(3, 1234), ep(2, 1234), ep(1, 1234)],
                vec![ep(1, 1234), ep(2, 1234), ep(3, 1234)],
                true,
            ),
            (
                "scrambled ports",
                vec![ep(1, 123), ep(1, 1234), ep(1, 12345)],
                vec![ep(1, 12345), ep(1, 123), ep(1, 1234)],
                true,
            ),
            (
                "one differing port",
                vec![ep(1, 80), ep(2, 80)],
                vec![ep(1, 80), ep(2, 81)],
                false,
            ),
            (
                "same members, different duplicates",
                vec![ep(1, 80), ep(1, 80), ep(2, 80)],
                vec![ep(1, 80), ep(2, 80), ep(2, 80)],
                false,
            ),
        ];

        for (name, a, b, want) in cases {
            assert_eq!(endpoints_equal(&a, &b), want, "case: {}", name);
            assert_eq!(endpoints_equal(&b, &a), want, "case (swapped): {}", name);
        }
    }
}
