//! ipfind Library
//!
//! IP address classification and multi-provider geolocation lookup.
//! Exposed as a library for the binary and for integration tests.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{GeoResolver, LookupService};
pub use config::{load_config, Config, ConfigError};
pub use domain::entities::{
    FailureReason, GeoRecord, ProviderSpec, PublicAddresses, ResolutionOutcome,
};
pub use domain::errors::{ClassificationError, ProviderError};
pub use domain::ports::{GeoProvider, PublicIpSource};
pub use domain::services::{classify, Classifier};
pub use domain::value_objects::{AddressScope, IpFamily, ValidatedAddress};
