//! Lookup API Server
//!
//! Thin HTTP shell over the lookup service. Every response body is JSON;
//! missing record fields are rendered as "unknown".

use crate::application::LookupService;
use crate::domain::entities::{FailureReason, GeoRecord, ResolutionOutcome};
use crate::domain::errors::ClassificationError;
use crate::domain::value_objects::IpFamily;
use crate::infrastructure::shutdown_signal;
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Successful lookup response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LookupResponse {
    pub ip: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub isp: String,
    pub asn: String,
    pub country_code: String,
    /// 4 or 6, from the address that was looked up
    pub ip_version: u8,
    pub provider: String,
}

impl LookupResponse {
    pub fn new(record: &GeoRecord, provider: &str, family: IpFamily) -> Self {
        Self {
            ip: GeoRecord::or_unknown(&record.ip).to_string(),
            city: GeoRecord::or_unknown(&record.city).to_string(),
            region: GeoRecord::or_unknown(&record.region).to_string(),
            country: GeoRecord::or_unknown(&record.country_name).to_string(),
            isp: GeoRecord::or_unknown(&record.org).to_string(),
            asn: GeoRecord::or_unknown(&record.asn).to_string(),
            country_code: GeoRecord::or_unknown(&record.country_code).to_string(),
            ip_version: family.version(),
            provider: provider.to_string(),
        }
    }
}

/// Failed lookup response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Caller address, plus this service's own public addresses.
#[derive(Debug, Serialize, Deserialize)]
pub struct MyIpResponse {
    pub ip: String,
    pub public_ipv4: String,
    pub public_ipv6: String,
}

/// Health response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub providers: Vec<String>,
}

/// API Server state.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<LookupService>,
}

impl ApiState {
    pub fn new(service: Arc<LookupService>) -> Self {
        Self { service }
    }
}

/// Build the API router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/myip", get(myip_handler))
        .route("/lookup", get(lookup_own_handler))
        .route("/lookup/:ip", get(lookup_handler))
        .with_state(state)
}

/// API Server for IP lookups.
pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
}

impl ApiServer {
    pub fn new(listen_addr: String, service: Arc<LookupService>) -> Self {
        Self {
            listen_addr,
            state: ApiState::new(service),
        }
    }

    /// Run the API server.
    ///
    /// Serves until Ctrl+C or SIGTERM, then drains in-flight requests.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self) -> anyhow::Result<()> {
        let app = router(self.state.clone()).layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("lookup API listening on {}", self.listen_addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("lookup API stopped");
        Ok(())
    }
}

/// First X-Forwarded-For entry, else the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<ConnectInfo<SocketAddr>>) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());

    forwarded.or_else(|| peer.map(|ConnectInfo(addr)| addr.ip()))
}

fn status_for(reason: &FailureReason) -> StatusCode {
    match reason {
        FailureReason::InvalidInput(ClassificationError::NonPublicAddress(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        FailureReason::InvalidInput(_) => StatusCode::BAD_REQUEST,
        FailureReason::AllProvidersFailed { .. } => StatusCode::BAD_GATEWAY,
        FailureReason::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn render(outcome: ResolutionOutcome) -> Response {
    match outcome {
        ResolutionOutcome::Success {
            record,
            provider,
            family,
        } => (
            StatusCode::OK,
            Json(LookupResponse::new(&record, &provider, family)),
        )
            .into_response(),
        ResolutionOutcome::Failure(reason) => {
            let body = ErrorResponse {
                error: reason.code().to_string(),
                message: reason.to_string(),
            };
            (status_for(&reason), Json(body)).into_response()
        }
    }
}

// Handler functions

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        providers: state.service.provider_names(),
    })
}

async fn myip_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> impl IntoResponse {
    let public = state.service.public_addresses().await;
    Json(MyIpResponse {
        ip: or_unknown(client_ip(&headers, peer)),
        public_ipv4: or_unknown(public.ipv4),
        public_ipv6: or_unknown(public.ipv6),
    })
}

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| GeoRecord::UNKNOWN.to_string())
}

async fn lookup_handler(State(state): State<ApiState>, Path(ip): Path<String>) -> Response {
    tracing::debug!("lookup requested for {:?}", ip);
    render(state.service.lookup(&ip).await)
}

async fn lookup_own_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let detected = client_ip(&headers, peer);
    render(state.service.lookup_own(detected).await)
}
