mod http_geo_provider;
mod http_public_ip_source;

pub use http_geo_provider::HttpGeoProvider;
pub use http_public_ip_source::{
    HttpPublicIpSource, DEFAULT_PUBLIC_IPV6_URL, DEFAULT_PUBLIC_IP_URL,
};
