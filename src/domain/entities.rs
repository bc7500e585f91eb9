//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the lookup domain.
//! Provider specs carry their own field mapping so the resolver never
//! needs to know which provider produced a payload.

use crate::domain::errors::{ClassificationError, ProviderError};
use crate::domain::value_objects::{IpFamily, ValidatedAddress};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Placeholder substituted with the address text in provider URL templates.
pub const IP_PLACEHOLDER: &str = "{ip}";

/// Normalized geolocation result, independent of the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoRecord {
    pub ip: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country_name: Option<String>,
    pub country_code: Option<String>,
    /// ISP or organisation
    pub org: Option<String>,
    pub asn: Option<String>,
}

impl GeoRecord {
    /// Sentinel shown for fields the provider did not supply.
    pub const UNKNOWN: &'static str = "unknown";

    /// Render an optional field, falling back to [`GeoRecord::UNKNOWN`].
    pub fn or_unknown(field: &Option<String>) -> &str {
        field.as_deref().unwrap_or(Self::UNKNOWN)
    }
}

/// How the provider reports the autonomous system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsnFormat {
    /// Field holds just the AS number, e.g. `AS15169`
    Plain,
    /// Field holds `AS15169 Google LLC`; keep the first token
    LeadingToken,
}

/// A JSON body shape that means "lookup refused" despite an HTTP 200.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSignal {
    pub field: String,
    pub value: Value,
    pub reason_field: Option<String>,
}

/// Provider JSON key for each `GeoRecord` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub ip: String,
    pub city: String,
    pub region: String,
    pub country_name: String,
    pub country_code: String,
    pub org: String,
    pub asn: String,
    pub asn_format: AsnFormat,
    #[serde(default)]
    pub error_signal: Option<ErrorSignal>,
}

impl FieldMapping {
    /// Build a record from a provider's JSON object.
    pub fn apply(&self, body: &Map<String, Value>) -> GeoRecord {
        let asn = text_field(body, &self.asn).and_then(|raw| match self.asn_format {
            AsnFormat::Plain => Some(raw),
            AsnFormat::LeadingToken => raw.split_whitespace().next().map(str::to_string),
        });

        GeoRecord {
            ip: text_field(body, &self.ip),
            city: text_field(body, &self.city),
            region: text_field(body, &self.region),
            country_name: text_field(body, &self.country_name),
            country_code: text_field(body, &self.country_code),
            org: text_field(body, &self.org),
            asn,
        }
    }

    /// Reason text if the body matches this provider's error signal.
    pub fn rejection(&self, body: &Map<String, Value>) -> Option<String> {
        let signal = self.error_signal.as_ref()?;
        if body.get(&signal.field) != Some(&signal.value) {
            return None;
        }

        let reason = signal
            .reason_field
            .as_ref()
            .and_then(|key| text_field(body, key))
            .unwrap_or_else(|| "unspecified".to_string());
        Some(reason)
    }
}

fn text_field(body: &Map<String, Value>, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Static description of one geolocation provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    /// URL with an `{ip}` placeholder
    pub url_template: String,
    pub timeout: Duration,
    /// Expected media type of the response body
    pub content_type: String,
    pub mapping: FieldMapping,
}

impl ProviderSpec {
    pub const IPAPI_CO: &'static str = "ipapi.co";
    pub const IP_API_COM: &'static str = "ip-api.com";

    /// ipapi.co: `country_name`/`org`/`asn`/`country_code`.
    pub fn ipapi_co(timeout: Duration) -> Self {
        Self {
            name: Self::IPAPI_CO.to_string(),
            url_template: "https://ipapi.co/{ip}/json/".to_string(),
            timeout,
            content_type: "application/json".to_string(),
            mapping: FieldMapping {
                ip: "ip".to_string(),
                city: "city".to_string(),
                region: "region".to_string(),
                country_name: "country_name".to_string(),
                country_code: "country_code".to_string(),
                org: "org".to_string(),
                asn: "asn".to_string(),
                asn_format: AsnFormat::Plain,
                error_signal: Some(ErrorSignal {
                    field: "error".to_string(),
                    value: Value::Bool(true),
                    reason_field: Some("reason".to_string()),
                }),
            },
        }
    }

    /// ip-api.com: `country`/`isp`/`as`/`countryCode`, ASN as a combined string.
    pub fn ip_api_com(timeout: Duration) -> Self {
        Self {
            name: Self::IP_API_COM.to_string(),
            url_template: "http://ip-api.com/json/{ip}".to_string(),
            timeout,
            content_type: "application/json".to_string(),
            mapping: FieldMapping {
                ip: "query".to_string(),
                city: "city".to_string(),
                region: "regionName".to_string(),
                country_name: "country".to_string(),
                country_code: "countryCode".to_string(),
                org: "isp".to_string(),
                asn: "as".to_string(),
                asn_format: AsnFormat::LeadingToken,
                error_signal: Some(ErrorSignal {
                    field: "status".to_string(),
                    value: Value::String("fail".to_string()),
                    reason_field: Some("message".to_string()),
                }),
            },
        }
    }

    /// Built-in spec by provider name.
    pub fn builtin(name: &str, timeout: Duration) -> Option<Self> {
        match name {
            Self::IPAPI_CO => Some(Self::ipapi_co(timeout)),
            Self::IP_API_COM => Some(Self::ip_api_com(timeout)),
            _ => None,
        }
    }

    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    pub fn has_placeholder(&self) -> bool {
        self.url_template.contains(IP_PLACEHOLDER)
    }

    pub fn url_for(&self, addr: &ValidatedAddress) -> String {
        self.url_template.replace(IP_PLACEHOLDER, addr.text())
    }

    /// Whether a `Content-Type` header value denotes a JSON body.
    pub fn accepts_content_type(&self, header: Option<&str>) -> bool {
        let Some(header) = header else {
            return false;
        };
        let essence = header
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        essence == self.content_type.to_ascii_lowercase()
            || essence.ends_with("/json")
            || essence.ends_with("+json")
    }
}

/// This service's own public addresses, one slot per family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicAddresses {
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

/// One failed provider attempt, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAttempt {
    pub provider: String,
    pub error: ProviderError,
}

/// Terminal failure of a lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("{0}")]
    InvalidInput(#[from] ClassificationError),
    #[error("All geolocation providers failed")]
    AllProvidersFailed { attempts: Vec<ProviderAttempt> },
    #[error("Geolocation lookup timed out")]
    Timeout,
}

impl FailureReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(err) => err.code(),
            Self::AllProvidersFailed { .. } => "all_providers_failed",
            Self::Timeout => "timeout",
        }
    }
}

/// The only thing a lookup returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Success {
        record: GeoRecord,
        provider: String,
        /// Family of the address that was looked up
        family: IpFamily,
    },
    Failure(FailureReason),
}

impl ResolutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn record(&self) -> Option<&GeoRecord> {
        match self {
            Self::Success { record, .. } => Some(record),
            Self::Failure(_) => None,
        }
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Success { provider, .. } => Some(provider),
            Self::Failure(_) => None,
        }
    }

    pub fn family(&self) -> Option<IpFamily> {
        match self {
            Self::Success { family, .. } => Some(*family),
            Self::Failure(_) => None,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::services::classify;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    // ===== FieldMapping Tests =====

    #[test]
    fn test_ipapi_co_mapping() {
        let spec = ProviderSpec::ipapi_co(Duration::from_secs(5));
        let body = object(json!({
            "ip": "8.8.8.8",
            "city": "Mountain View",
            "region": "California",
            "country_name": "United States",
            "org": "Google LLC",
            "asn": "AS15169",
            "country_code": "US"
        }));

        let record = spec.mapping.apply(&body);
        assert_eq!(record.ip.as_deref(), Some("8.8.8.8"));
        assert_eq!(record.city.as_deref(), Some("Mountain View"));
        assert_eq!(record.region.as_deref(), Some("California"));
        assert_eq!(record.country_name.as_deref(), Some("United States"));
        assert_eq!(record.country_code.as_deref(), Some("US"));
        assert_eq!(record.org.as_deref(), Some("Google LLC"));
        assert_eq!(record.asn.as_deref(), Some("AS15169"));
    }

    #[test]
    fn test_ip_api_com_mapping_takes_leading_asn_token() {
        let spec = ProviderSpec::ip_api_com(Duration::from_secs(5));
        let body = object(json!({
            "status": "success",
            "query": "8.8.8.8",
            "city": "Ashburn",
            "regionName": "Virginia",
            "country": "United States",
            "countryCode": "US",
            "isp": "Google LLC",
            "as": "AS15169 Google LLC"
        }));

        let record = spec.mapping.apply(&body);
        assert_eq!(record.asn.as_deref(), Some("AS15169"));
        assert_eq!(record.ip.as_deref(), Some("8.8.8.8"));
        assert_eq!(record.region.as_deref(), Some("Virginia"));
        assert_eq!(record.org.as_deref(), Some("Google LLC"));
        assert_eq!(record.country_code.as_deref(), Some("US"));
    }

    #[test]
    fn test_missing_and_blank_fields_are_absent() {
        let spec = ProviderSpec::ip_api_com(Duration::from_secs(5));
        let body = object(json!({
            "city": "",
            "regionName": null,
            "as": "   "
        }));

        let record = spec.mapping.apply(&body);
        assert_eq!(record, GeoRecord::default());
    }

    #[test]
    fn test_numeric_field_rendered_as_text() {
        let mut mapping = ProviderSpec::ipapi_co(Duration::from_secs(5)).mapping;
        mapping.asn = "asn_number".to_string();
        let body = object(json!({ "asn_number": 15169 }));

        assert_eq!(mapping.apply(&body).asn.as_deref(), Some("15169"));
    }

    #[test]
    fn test_rejection_ipapi_co() {
        let spec = ProviderSpec::ipapi_co(Duration::from_secs(5));
        let body = object(json!({ "error": true, "reason": "RateLimited" }));
        assert_eq!(spec.mapping.rejection(&body).as_deref(), Some("RateLimited"));
    }

    #[test]
    fn test_rejection_ip_api_com() {
        let spec = ProviderSpec::ip_api_com(Duration::from_secs(5));
        let body = object(json!({ "status": "fail", "message": "private range" }));
        assert_eq!(spec.mapping.rejection(&body).as_deref(), Some("private range"));

        let ok = object(json!({ "status": "success" }));
        assert!(spec.mapping.rejection(&ok).is_none());
    }

    #[test]
    fn test_rejection_without_reason_field() {
        let spec = ProviderSpec::ipapi_co(Duration::from_secs(5));
        let body = object(json!({ "error": true }));
        assert_eq!(spec.mapping.rejection(&body).as_deref(), Some("unspecified"));
    }

    // ===== ProviderSpec Tests =====

    #[test]
    fn test_url_for_substitutes_address() {
        let spec = ProviderSpec::ipapi_co(Duration::from_secs(5));
        let addr = classify("8.8.8.8").unwrap();
        assert_eq!(spec.url_for(&addr), "https://ipapi.co/8.8.8.8/json/");
    }

    #[test]
    fn test_builtin_lookup() {
        let timeout = Duration::from_secs(3);
        assert_eq!(
            ProviderSpec::builtin("ipapi.co", timeout).map(|s| s.name),
            Some("ipapi.co".to_string())
        );
        assert_eq!(
            ProviderSpec::builtin("ip-api.com", timeout).map(|s| s.timeout),
            Some(timeout)
        );
        assert!(ProviderSpec::builtin("nope", timeout).is_none());
    }

    #[test]
    fn test_has_placeholder() {
        let spec = ProviderSpec::ipapi_co(Duration::from_secs(5));
        assert!(spec.has_placeholder());
        assert!(!spec.with_url_template("https://example.com/json").has_placeholder());
    }

    #[test]
    fn test_accepts_content_type() {
        let spec = ProviderSpec::ipapi_co(Duration::from_secs(5));
        assert!(spec.accepts_content_type(Some("application/json")));
        assert!(spec.accepts_content_type(Some("application/json; charset=utf-8")));
        assert!(spec.accepts_content_type(Some("Application/JSON")));
        assert!(spec.accepts_content_type(Some("application/problem+json")));
        assert!(!spec.accepts_content_type(Some("text/html; charset=utf-8")));
        assert!(!spec.accepts_content_type(Some("text/plain")));
        assert!(!spec.accepts_content_type(None));
    }

    // ===== Outcome Tests =====

    #[test]
    fn test_failure_codes() {
        assert_eq!(
            FailureReason::from(ClassificationError::MalformedFormat).code(),
            "malformed_format"
        );
        assert_eq!(
            FailureReason::AllProvidersFailed { attempts: vec![] }.code(),
            "all_providers_failed"
        );
        assert_eq!(FailureReason::Timeout.code(), "timeout");
    }

    #[test]
    fn test_outcome_accessors() {
        let success = ResolutionOutcome::Success {
            record: GeoRecord::default(),
            provider: "ipapi.co".to_string(),
            family: IpFamily::V6,
        };
        assert!(success.is_success());
        assert_eq!(success.provider(), Some("ipapi.co"));
        assert_eq!(success.family(), Some(IpFamily::V6));
        assert!(success.record().is_some());

        let failure = ResolutionOutcome::Failure(FailureReason::Timeout);
        assert!(!failure.is_success());
        assert!(failure.provider().is_none());
        assert!(failure.record().is_none());
        assert!(failure.family().is_none());
    }

    #[test]
    fn test_or_unknown() {
        assert_eq!(GeoRecord::or_unknown(&None), "unknown");
        assert_eq!(GeoRecord::or_unknown(&Some("US".to_string())), "US");
    }

    #[test]
    fn test_provider_spec_serde_roundtrip_keeps_mapping() {
        let spec = ProviderSpec::ip_api_com(Duration::from_secs(4));
        let json = serde_json::to_string(&spec).unwrap();
        let parsed: ProviderSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, spec);
    }
}
