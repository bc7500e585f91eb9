//! Geo Resolver - Provider fallback chain
//!
//! Queries providers strictly in priority order. The first provider that
//! returns a usable record wins; every failure is recorded and the next
//! provider is tried. Nothing here ever returns a transport error directly.

use crate::domain::entities::{FailureReason, ProviderAttempt, ResolutionOutcome};
use crate::domain::errors::{ClassificationError, ProviderError};
use crate::domain::ports::GeoProvider;
use crate::domain::value_objects::ValidatedAddress;
use std::sync::Arc;
use std::time::Duration;

/// Ordered chain of geolocation providers.
///
/// The chain is fixed at construction and read-only afterwards, so one
/// resolver can be shared across any number of concurrent lookups.
pub struct GeoResolver {
    providers: Vec<Arc<dyn GeoProvider>>,
    deadline: Option<Duration>,
}

impl GeoResolver {
    /// Create a resolver over providers in priority order.
    pub fn new(providers: Vec<Arc<dyn GeoProvider>>) -> Self {
        Self {
            providers,
            deadline: None,
        }
    }

    /// Cap the whole chain. When it elapses the outcome is `Failure(Timeout)`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Provider names in the order they are tried.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Longest a single `resolve` call can take.
    pub fn max_duration(&self) -> Duration {
        let chain: Duration = self.providers.iter().map(|p| p.timeout()).sum();
        match self.deadline {
            Some(deadline) => chain.min(deadline),
            None => chain,
        }
    }

    /// Resolve a validated address through the provider chain.
    pub async fn resolve(&self, addr: &ValidatedAddress) -> ResolutionOutcome {
        if !addr.scope().is_public() {
            return ResolutionOutcome::Failure(FailureReason::InvalidInput(
                ClassificationError::NonPublicAddress(addr.scope()),
            ));
        }

        match self.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, self.run_chain(addr)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!("lookup for {} exceeded deadline of {:?}", addr, deadline);
                    ResolutionOutcome::Failure(FailureReason::Timeout)
                }
            },
            None => self.run_chain(addr).await,
        }
    }

    async fn run_chain(&self, addr: &ValidatedAddress) -> ResolutionOutcome {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let result = match tokio::time::timeout(provider.timeout(), provider.lookup(addr)).await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout),
            };

            match result {
                Ok(mut record) => {
                    if record.ip.is_none() {
                        record.ip = Some(addr.text().to_string());
                    }
                    tracing::debug!("resolved {} via {}", addr, provider.name());
                    return ResolutionOutcome::Success {
                        record,
                        provider: provider.name().to_string(),
                        family: addr.family(),
                    };
                }
                Err(error) => {
                    tracing::warn!("provider {} failed for {}: {}", provider.name(), addr, error);
                    attempts.push(ProviderAttempt {
                        provider: provider.name().to_string(),
                        error,
                    });
                }
            }
        }

        tracing::warn!(
            "all {} providers failed for {}",
            self.providers.len(),
            addr
        );
        ResolutionOutcome::Failure(FailureReason::AllProvidersFailed { attempts })
    }
}
