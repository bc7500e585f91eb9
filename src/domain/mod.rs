//! Domain Layer
//!
//! Pure lookup concepts: addresses, records, provider specs and the ports
//! the application layer talks through. Nothing here performs I/O.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;
