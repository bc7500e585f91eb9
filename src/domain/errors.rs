//! Domain Errors
//!
//! Typed failures for classification and for a single provider attempt.
//! None of these are fatal; callers turn them into a `ResolutionOutcome`.

use crate::domain::value_objects::AddressScope;

/// Why a candidate string was not accepted as a lookup target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationError {
    #[error("No IP address provided")]
    EmptyInput,
    #[error("Invalid IP address format")]
    MalformedFormat,
    #[error("Private, reserved, or special-use IP addresses are not allowed ({0})")]
    NonPublicAddress(AddressScope),
}

impl ClassificationError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::MalformedFormat => "malformed_format",
            Self::NonPublicAddress(_) => "non_public_address",
        }
    }
}

/// Failure of one attempt against one provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status: {0}")]
    UnexpectedStatus(u16),
    #[error("response is not JSON")]
    NonJsonResponse,
    #[error("response body exceeds {0} bytes")]
    OversizedBody(usize),
    #[error("malformed JSON: {0}")]
    MalformedJson(String),
    #[error("provider rejected lookup: {0}")]
    Rejected(String),
}
