//! ipfind - IP geolocation lookup service
//!
//! This is the composition root that wires together all the components.

use ipfind::adapters::inbound::ApiServer;
use ipfind::adapters::outbound::{HttpGeoProvider, HttpPublicIpSource};
use ipfind::{load_config, Classifier, GeoProvider, GeoResolver, LookupService, PublicIpSource};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting ipfind listen={} providers={}",
        cfg.listen_addr,
        cfg.providers.join(",")
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters share one HTTP client (connection pool)
    let client = reqwest::Client::builder()
        .user_agent(concat!("ipfind/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let providers: Vec<Arc<dyn GeoProvider>> = cfg
        .provider_specs()?
        .into_iter()
        .map(|spec| Arc::new(HttpGeoProvider::new(spec, client.clone())) as Arc<dyn GeoProvider>)
        .collect();

    let public_ip: Arc<dyn PublicIpSource> =
        Arc::new(HttpPublicIpSource::new(cfg.public_ip_url.clone(), client.clone()));
    let public_ipv6 = cfg.public_ipv6_url.clone().map(|url| {
        Arc::new(HttpPublicIpSource::new(url, client.clone())) as Arc<dyn PublicIpSource>
    });

    // 2. Application service
    let mut resolver = GeoResolver::new(providers);
    if let Some(deadline) = cfg.request_timeout() {
        resolver = resolver.with_deadline(deadline);
    }
    tracing::info!("lookups bounded by {:?}", resolver.max_duration());

    let mut service = LookupService::new(
        Classifier::new(cfg.ipv6_scope_checks),
        resolver,
        Some(public_ip),
    );
    if let Some(source) = public_ipv6 {
        service = service.with_public_ipv6(source);
    }
    let service = Arc::new(service);

    // 3. Inbound adapter
    let server = ApiServer::new(cfg.listen_addr.clone(), service);

    server.run().await
}
