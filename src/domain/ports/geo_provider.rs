//! Geolocation Provider Port
//!
//! Defines the interface for looking up a single address against a
//! single external geolocation service.

use crate::domain::entities::GeoRecord;
use crate::domain::errors::ProviderError;
use crate::domain::value_objects::ValidatedAddress;
use async_trait::async_trait;
use std::time::Duration;

/// One geolocation provider in the fallback chain.
///
/// This is an outbound port. Implementations make exactly one attempt per
/// call and must return within `timeout()`.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Provider name reported alongside a successful record.
    fn name(&self) -> &str;

    /// Upper bound on a single `lookup` call.
    fn timeout(&self) -> Duration;

    /// Look up one address.
    async fn lookup(&self, addr: &ValidatedAddress) -> Result<GeoRecord, ProviderError>;
}
