//! Address Classifier - Domain Service
//!
//! Decides whether an untrusted string is a publicly routable IP address.
//! Matching is a single pass over at most `MAX_ADDRESS_LEN` bytes, so
//! arbitrary input cannot make it blow up.

use crate::domain::errors::ClassificationError;
use crate::domain::value_objects::{AddressScope, IpFamily, ValidatedAddress};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Longest textual address we accept (full IPv6 with embedded IPv4 is 45).
const MAX_ADDRESS_LEN: usize = 45;

/// Address classifier.
///
/// IPv4 scope rules are fixed. IPv6 scope checks can be switched off, in
/// which case every well-formed IPv6 address is treated as public.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    ipv6_scope_checks: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            ipv6_scope_checks: true,
        }
    }
}

impl Classifier {
    pub fn new(ipv6_scope_checks: bool) -> Self {
        Self { ipv6_scope_checks }
    }

    /// Classify a candidate address.
    ///
    /// Surrounding whitespace is ignored. Returns a `ValidatedAddress` only
    /// for well-formed public addresses.
    pub fn classify(&self, raw: &str) -> Result<ValidatedAddress, ClassificationError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ClassificationError::EmptyInput);
        }
        if text.len() > MAX_ADDRESS_LEN {
            return Err(ClassificationError::MalformedFormat);
        }

        let (family, scope, ip) = if let Some(octets) = parse_ipv4(text) {
            let scope = ipv4_scope(octets);
            (IpFamily::V4, scope, IpAddr::V4(Ipv4Addr::from(octets)))
        } else if looks_like_ipv6(text) {
            let v6: Ipv6Addr = text
                .parse()
                .map_err(|_| ClassificationError::MalformedFormat)?;
            let scope = if self.ipv6_scope_checks {
                ipv6_scope(&v6)
            } else {
                AddressScope::Public
            };
            (IpFamily::V6, scope, IpAddr::V6(v6))
        } else {
            return Err(ClassificationError::MalformedFormat);
        };

        if !scope.is_public() {
            return Err(ClassificationError::NonPublicAddress(scope));
        }

        Ok(ValidatedAddress::new(text.to_string(), family, scope, ip))
    }
}

/// Classify with default settings (IPv6 scope checks on).
pub fn classify(raw: &str) -> Result<ValidatedAddress, ClassificationError> {
    Classifier::default().classify(raw)
}

/// Four dot-separated groups of 1-3 decimal digits, each <= 255.
fn parse_ipv4(text: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut groups = text.split('.');

    for slot in octets.iter_mut() {
        let group = groups.next()?;
        if group.is_empty() || group.len() > 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u16 = group.parse().ok()?;
        *slot = u8::try_from(value).ok()?;
    }

    if groups.next().is_some() {
        return None;
    }
    Some(octets)
}

fn looks_like_ipv6(text: &str) -> bool {
    text.contains(':') && text.bytes().all(|b| b.is_ascii_hexdigit() || b == b':')
}

fn ipv4_scope(octets: [u8; 4]) -> AddressScope {
    match octets {
        [10, ..] => AddressScope::Private,
        [172, 16..=31, ..] => AddressScope::Private,
        [192, 168, ..] => AddressScope::Private,
        [169, 254, ..] => AddressScope::LinkLocal,
        [127, ..] => AddressScope::Loopback,
        [0, ..] => AddressScope::Reserved,
        [224..=239, ..] => AddressScope::Multicast,
        [240..=255, ..] => AddressScope::Reserved,
        _ => AddressScope::Public,
    }
}

fn ipv6_scope(ip: &Ipv6Addr) -> AddressScope {
    // ::ffff:a.b.c.d carries the IPv4 address; its scope is the IPv4 one.
    if let Some(v4) = ip.to_ipv4_mapped() {
        return ipv4_scope(v4.octets());
    }

    let first = ip.segments()[0];

    if ip.is_unspecified() {
        AddressScope::Reserved
    } else if ip.is_loopback() {
        AddressScope::Loopback
    } else if first & 0xffc0 == 0xfe80 {
        AddressScope::LinkLocal
    } else if first & 0xfe00 == 0xfc00 {
        AddressScope::Private
    } else if ip.is_multicast() {
        AddressScope::Multicast
    } else {
        AddressScope::Public
    }
}
