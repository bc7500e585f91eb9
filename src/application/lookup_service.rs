//! Lookup Service - Main application use case
//!
//! Ties the classifier to the resolver: untrusted text goes in, a
//! `ResolutionOutcome` comes out. This is the primary interface for the
//! inbound adapter.

use crate::application::GeoResolver;
use crate::domain::entities::{FailureReason, PublicAddresses, ResolutionOutcome};
use crate::domain::errors::ClassificationError;
use crate::domain::ports::PublicIpSource;
use crate::domain::services::Classifier;
use crate::domain::value_objects::ValidatedAddress;
use std::net::IpAddr;
use std::sync::Arc;

/// Lookup service - classify, then resolve.
pub struct LookupService {
    classifier: Classifier,
    resolver: GeoResolver,
    public_ip: Option<Arc<dyn PublicIpSource>>,
    public_ipv6: Option<Arc<dyn PublicIpSource>>,
}

impl LookupService {
    pub fn new(
        classifier: Classifier,
        resolver: GeoResolver,
        public_ip: Option<Arc<dyn PublicIpSource>>,
    ) -> Self {
        Self {
            classifier,
            resolver,
            public_ip,
            public_ipv6: None,
        }
    }

    /// Add a source that reports our IPv6 address (e.g. api64.ipify.org).
    pub fn with_public_ipv6(mut self, source: Arc<dyn PublicIpSource>) -> Self {
        self.public_ipv6 = Some(source);
        self
    }

    pub fn classify(&self, raw: &str) -> Result<ValidatedAddress, ClassificationError> {
        self.classifier.classify(raw)
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.resolver.provider_names()
    }

    /// Look up an untrusted address string.
    pub async fn lookup(&self, raw: &str) -> ResolutionOutcome {
        match self.classifier.classify(raw) {
            Ok(addr) => self.resolver.resolve(&addr).await,
            Err(err) => {
                tracing::debug!("rejected lookup input: {}", err);
                ResolutionOutcome::Failure(FailureReason::InvalidInput(err))
            }
        }
    }

    /// Look up the caller's own address.
    ///
    /// A caller arriving from a non-public address (loopback, LAN) gets the
    /// location of our own public IP instead, if one can be discovered.
    pub async fn lookup_own(&self, detected: Option<IpAddr>) -> ResolutionOutcome {
        let detected_err = match detected {
            Some(ip) => match self.classify_ip(ip) {
                Ok(addr) => return self.resolver.resolve(&addr).await,
                Err(err) => err,
            },
            None => ClassificationError::EmptyInput,
        };

        let Some(source) = &self.public_ip else {
            return ResolutionOutcome::Failure(FailureReason::InvalidInput(detected_err));
        };

        tracing::debug!(
            "caller address {:?} not resolvable ({}), using public IP",
            detected,
            detected_err
        );

        match source.fetch().await {
            Some(public_ip) => match self.classify_ip(public_ip) {
                Ok(addr) => self.resolver.resolve(&addr).await,
                Err(err) => ResolutionOutcome::Failure(FailureReason::InvalidInput(err)),
            },
            None => {
                tracing::warn!("public IP could not be determined");
                ResolutionOutcome::Failure(FailureReason::InvalidInput(detected_err))
            }
        }
    }

    /// Our own public IPv4 and IPv6 addresses, fetched concurrently.
    ///
    /// A source answering with the other family leaves that slot empty;
    /// dual-stack endpoints fall back to IPv4 on IPv4-only hosts.
    pub async fn public_addresses(&self) -> PublicAddresses {
        let (v4, v6) = tokio::join!(
            fetch_from(self.public_ip.as_deref()),
            fetch_from(self.public_ipv6.as_deref())
        );

        PublicAddresses {
            ipv4: match v4 {
                Some(IpAddr::V4(ip)) => Some(ip),
                _ => None,
            },
            ipv6: match v6 {
                Some(IpAddr::V6(ip)) => Some(ip),
                _ => None,
            },
        }
    }

    /// Classify a socket-level address, unwrapping IPv4-mapped IPv6.
    fn classify_ip(&self, ip: IpAddr) -> Result<ValidatedAddress, ClassificationError> {
        let ip = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
            IpAddr::V4(_) => ip,
        };
        self.classifier.classify(&ip.to_string())
    }
}

async fn fetch_from(source: Option<&dyn PublicIpSource>) -> Option<IpAddr> {
    match source {
        Some(source) => source.fetch().await,
        None => None,
    }
}
