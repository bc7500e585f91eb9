//! Adapters Layer
//!
//! Inbound adapters drive the application (HTTP API); outbound adapters
//! implement domain ports against external services.

pub mod inbound;
pub mod outbound;
