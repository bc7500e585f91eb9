//! Application Layer
//!
//! Use cases that orchestrate domain services and ports.

mod geo_resolver;
mod lookup_service;

pub use geo_resolver::GeoResolver;
pub use lookup_service::LookupService;
