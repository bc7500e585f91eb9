//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Address family of a validated address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V4 => "ipv4",
            Self::V6 => "ipv6",
        }
    }

    /// Numeric IP version, 4 or 6.
    pub fn version(&self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V6 => 6,
        }
    }
}

impl std::fmt::Display for IpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Routing scope of an address.
///
/// Only `Public` addresses are ever sent to a geolocation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressScope {
    /// Globally routable
    Public,
    /// RFC 1918 (IPv4) or unique-local fc00::/7 (IPv6)
    Private,
    /// 127.0.0.0/8 or ::1
    Loopback,
    /// 169.254.0.0/16 or fe80::/10
    LinkLocal,
    /// 224.0.0.0/4 or ff00::/8
    Multicast,
    /// 0.0.0.0/8, 240.0.0.0/4 or ::
    Reserved,
}

impl AddressScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Loopback => "loopback",
            Self::LinkLocal => "link-local",
            Self::Multicast => "multicast",
            Self::Reserved => "reserved",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }
}

impl std::fmt::Display for AddressScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An address that passed classification.
///
/// Instances are only created by the classifier, so holders can rely on
/// the text being a well-formed address whose scope is `Public`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedAddress {
    text: String,
    family: IpFamily,
    scope: AddressScope,
    ip: IpAddr,
}

impl ValidatedAddress {
    pub(crate) fn new(text: String, family: IpFamily, scope: AddressScope, ip: IpAddr) -> Self {
        Self {
            text,
            family,
            scope,
            ip,
        }
    }

    /// The address as submitted, with surrounding whitespace removed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn family(&self) -> IpFamily {
        self.family
    }

    pub fn scope(&self) -> AddressScope {
        self.scope
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }
}

impl std::fmt::Display for ValidatedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
