//! HTTP Geolocation Provider
//!
//! Implements GeoProvider for JSON-over-HTTP lookup services described by a
//! `ProviderSpec`. The body is only parsed once the status, declared content
//! type and non-empty body all look right; rate-limit pages served as
//! `200 text/html` are common.

use crate::domain::entities::{GeoRecord, ProviderSpec};
use crate::domain::errors::ProviderError;
use crate::domain::ports::GeoProvider;
use crate::domain::value_objects::ValidatedAddress;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

/// Largest body read from a provider; lookup payloads are well under 4 KiB.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Provider backed by an HTTP JSON endpoint.
pub struct HttpGeoProvider {
    spec: ProviderSpec,
    client: reqwest::Client,
}

impl HttpGeoProvider {
    /// Create a provider. The client can be shared between providers.
    pub fn new(spec: ProviderSpec, client: reqwest::Client) -> Self {
        Self { spec, client }
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }
}

#[async_trait]
impl GeoProvider for HttpGeoProvider {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn timeout(&self) -> Duration {
        self.spec.timeout
    }

    async fn lookup(&self, addr: &ValidatedAddress) -> Result<GeoRecord, ProviderError> {
        let url = self.spec.url_for(addr);
        tracing::debug!("querying {} at {}", self.spec.name, url);

        let mut response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(self.spec.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !self.spec.accepts_content_type(content_type.as_deref()) {
            return Err(ProviderError::NonJsonResponse);
        }

        if response
            .content_length()
            .is_some_and(|len| len > MAX_BODY_BYTES as u64)
        {
            return Err(ProviderError::OversizedBody(MAX_BODY_BYTES));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(ProviderError::OversizedBody(MAX_BODY_BYTES));
            }
            body.extend_from_slice(&chunk);
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ProviderError::NonJsonResponse);
        }

        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::MalformedJson(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(ProviderError::MalformedJson(
                "expected a JSON object".to_string(),
            ));
        };

        if let Some(reason) = self.spec.mapping.rejection(&fields) {
            return Err(ProviderError::Rejected(reason));
        }

        Ok(self.spec.mapping.apply(&fields))
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(err.to_string())
    }
}
