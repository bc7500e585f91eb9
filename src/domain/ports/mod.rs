mod geo_provider;
mod public_ip_source;

pub use geo_provider::GeoProvider;
pub use public_ip_source::PublicIpSource;
