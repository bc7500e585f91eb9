//! Public IP Source Port
//!
//! Discovers the public address this service is reachable at.

use async_trait::async_trait;
use std::net::IpAddr;

/// Source for our own public IP address.
///
/// Used when a caller asks for its own location but arrives from a
/// non-routable address (loopback, LAN).
#[async_trait]
pub trait PublicIpSource: Send + Sync {
    /// Fetch the public address, or None if it cannot be determined.
    async fn fetch(&self) -> Option<IpAddr>;
}
