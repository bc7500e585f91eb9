use crate::adapters::outbound::{DEFAULT_PUBLIC_IPV6_URL, DEFAULT_PUBLIC_IP_URL};
use crate::domain::entities::ProviderSpec;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub debug: bool,

    // Provider chain, in priority order
    pub providers: Vec<String>,
    pub provider_timeout_secs: u64,
    pub ipapi_co_url: Option<String>,
    pub ip_api_com_url: Option<String>,

    // Overall cap on one lookup; None means the sum of provider timeouts
    pub request_timeout_secs: Option<u64>,

    pub public_ip_url: String,
    // None disables IPv6 public address discovery
    pub public_ipv6_url: Option<String>,
    pub ipv6_scope_checks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            debug: false,
            providers: vec![
                ProviderSpec::IPAPI_CO.to_string(),
                ProviderSpec::IP_API_COM.to_string(),
            ],
            provider_timeout_secs: 5,
            ipapi_co_url: None,
            ip_api_com_url: None,
            request_timeout_secs: None,
            public_ip_url: DEFAULT_PUBLIC_IP_URL.to_string(),
            public_ipv6_url: Some(DEFAULT_PUBLIC_IPV6_URL.to_string()),
            ipv6_scope_checks: true,
        }
    }
}

/// Provider configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no geolocation providers configured")]
    NoProviders,
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("URL template for {provider} has no {{ip}} placeholder")]
    MissingPlaceholder { provider: String },
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

impl Config {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Reject timeouts that would fail every lookup before it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("IPFIND_PROVIDER_TIMEOUT_SECS"));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::ZeroTimeout("IPFIND_REQUEST_TIMEOUT_SECS"));
        }
        Ok(())
    }

    /// Build the ordered provider specs, applying URL overrides.
    pub fn provider_specs(&self) -> Result<Vec<ProviderSpec>, ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }
        self.validate()?;

        self.providers
            .iter()
            .map(|name| {
                let spec = ProviderSpec::builtin(name, self.provider_timeout())
                    .ok_or_else(|| ConfigError::UnknownProvider(name.clone()))?;

                let url_override = match name.as_str() {
                    ProviderSpec::IPAPI_CO => self.ipapi_co_url.as_ref(),
                    ProviderSpec::IP_API_COM => self.ip_api_com_url.as_ref(),
                    _ => None,
                };
                let spec = match url_override {
                    Some(url) => spec.with_url_template(url.clone()),
                    None => spec,
                };

                if !spec.has_placeholder() {
                    return Err(ConfigError::MissingPlaceholder {
                        provider: spec.name,
                    });
                }
                Ok(spec)
            })
            .collect()
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(default)
}

pub fn load_config() -> anyhow::Result<Config> {
    let defaults = Config::default();

    let listen_addr = std::env::var("IPFIND_LISTEN_ADDR")
        .unwrap_or_else(|_| defaults.listen_addr.clone());

    let debug = std::env::var("DEBUG").is_ok();

    let providers = std::env::var("IPFIND_PROVIDERS")
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_else(|_| defaults.providers.clone());

    let provider_timeout_secs = std::env::var("IPFIND_PROVIDER_TIMEOUT_SECS")
        .unwrap_or_else(|_| "5".to_string())
        .parse()
        .unwrap_or(defaults.provider_timeout_secs);

    let ipapi_co_url = std::env::var("IPFIND_IPAPI_CO_URL").ok();
    let ip_api_com_url = std::env::var("IPFIND_IP_API_COM_URL").ok();

    let request_timeout_secs = std::env::var("IPFIND_REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok());

    let public_ip_url = std::env::var("IPFIND_PUBLIC_IP_URL")
        .unwrap_or_else(|_| defaults.public_ip_url.clone());

    // Set but empty turns the IPv6 source off
    let public_ipv6_url = match std::env::var("IPFIND_PUBLIC_IPV6_URL") {
        Ok(url) if url.trim().is_empty() => None,
        Ok(url) => Some(url),
        Err(_) => defaults.public_ipv6_url.clone(),
    };

    let ipv6_scope_checks = env_flag("IPFIND_IPV6_SCOPE_CHECKS", defaults.ipv6_scope_checks);

    let cfg = Config {
        listen_addr,
        debug,
        providers,
        provider_timeout_secs,
        ipapi_co_url,
        ip_api_com_url,
        request_timeout_secs,
        public_ip_url,
        public_ipv6_url,
        ipv6_scope_checks,
    };
    cfg.validate()?;

    Ok(cfg)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    // Tests touching the environment take this lock; cargo runs tests in parallel.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn env_guard() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:5000");
        assert_eq!(cfg.providers, vec!["ipapi.co", "ip-api.com"]);
        assert_eq!(cfg.provider_timeout(), Duration::from_secs(5));
        assert!(cfg.request_timeout().is_none());
        assert!(cfg.ipv6_scope_checks);
        assert_eq!(cfg.public_ipv6_url.as_deref(), Some("https://api64.ipify.org"));
    }

    #[test]
    fn test_default_provider_specs_in_order() {
        let specs = Config::default().provider_specs().unwrap();
        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ipapi.co", "ip-api.com"]);
        assert!(specs.iter().all(|s| s.timeout == Duration::from_secs(5)));
    }

    #[test]
    fn test_provider_specs_reordered() {
        let cfg = Config {
            providers: vec!["ip-api.com".to_string(), "ipapi.co".to_string()],
            ..Config::default()
        };
        let specs = cfg.provider_specs().unwrap();
        assert_eq!(specs[0].name, "ip-api.com");
        assert_eq!(specs[1].name, "ipapi.co");
    }

    #[test]
    fn test_provider_specs_url_override() {
        let cfg = Config {
            ipapi_co_url: Some("http://localhost:9000/{ip}".to_string()),
            ..Config::default()
        };
        let specs = cfg.provider_specs().unwrap();
        assert_eq!(specs[0].url_template, "http://localhost:9000/{ip}");
        assert_eq!(specs[1].url_template, "http://ip-api.com/json/{ip}");
    }

    #[test]
    fn test_provider_specs_missing_placeholder() {
        let cfg = Config {
            ip_api_com_url: Some("http://localhost:9000/json".to_string()),
            ..Config::default()
        };
        assert_eq!(
            cfg.provider_specs(),
            Err(ConfigError::MissingPlaceholder {
                provider: "ip-api.com".to_string()
            })
        );
    }

    #[test]
    fn test_provider_specs_unknown_provider() {
        let cfg = Config {
            providers: vec!["ipinfo.io".to_string()],
            ..Config::default()
        };
        assert_eq!(
            cfg.provider_specs(),
            Err(ConfigError::UnknownProvider("ipinfo.io".to_string()))
        );
    }

    #[test]
    fn test_provider_specs_empty() {
        let cfg = Config {
            providers: vec![],
            ..Config::default()
        };
        assert_eq!(cfg.provider_specs(), Err(ConfigError::NoProviders));
    }

    #[test]
    fn test_load_config_defaults() {
        let _guard = env_guard();
        std::env::remove_var("IPFIND_LISTEN_ADDR");
        std::env::remove_var("IPFIND_PROVIDERS");

        let cfg = load_config().unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:5000");
        assert_eq!(cfg.providers, vec!["ipapi.co", "ip-api.com"]);
    }

    #[test]
    fn test_load_config_with_providers() {
        let _guard = env_guard();
        std::env::set_var("IPFIND_PROVIDERS", " ip-api.com , ,ipapi.co");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.providers, vec!["ip-api.com", "ipapi.co"]);
        std::env::remove_var("IPFIND_PROVIDERS");
    }

    #[test]
    fn test_load_config_with_timeouts() {
        let _guard = env_guard();
        std::env::set_var("IPFIND_PROVIDER_TIMEOUT_SECS", "3");
        std::env::set_var("IPFIND_REQUEST_TIMEOUT_SECS", "7");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.provider_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.request_timeout(), Some(Duration::from_secs(7)));
        std::env::remove_var("IPFIND_PROVIDER_TIMEOUT_SECS");
        std::env::remove_var("IPFIND_REQUEST_TIMEOUT_SECS");
    }

    #[test]
    fn test_load_config_parse_error_uses_default() {
        let _guard = env_guard();
        std::env::set_var("IPFIND_PROVIDER_TIMEOUT_SECS", "not_a_number");
        std::env::set_var("IPFIND_REQUEST_TIMEOUT_SECS", "soon");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.provider_timeout_secs, 5); // default
        assert!(cfg.request_timeout_secs.is_none());
        std::env::remove_var("IPFIND_PROVIDER_TIMEOUT_SECS");
        std::env::remove_var("IPFIND_REQUEST_TIMEOUT_SECS");
    }

    #[test]
    fn test_load_config_ipv6_scope_checks_disabled() {
        let _guard = env_guard();
        std::env::set_var("IPFIND_IPV6_SCOPE_CHECKS", "false");
        let cfg = load_config().unwrap();
        assert!(!cfg.ipv6_scope_checks);
        std::env::remove_var("IPFIND_IPV6_SCOPE_CHECKS");
    }

    #[test]
    fn test_provider_specs_zero_provider_timeout() {
        let cfg = Config {
            provider_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(
            cfg.provider_specs(),
            Err(ConfigError::ZeroTimeout("IPFIND_PROVIDER_TIMEOUT_SECS"))
        );
    }

    #[test]
    fn test_provider_specs_zero_request_timeout() {
        let cfg = Config {
            request_timeout_secs: Some(0),
            ..Config::default()
        };
        assert_eq!(
            cfg.provider_specs(),
            Err(ConfigError::ZeroTimeout("IPFIND_REQUEST_TIMEOUT_SECS"))
        );
    }

    #[test]
    fn test_load_config_rejects_zero_provider_timeout() {
        let _guard = env_guard();
        std::env::set_var("IPFIND_PROVIDER_TIMEOUT_SECS", "0");
        let err = load_config().unwrap_err();
        assert!(err.to_string().contains("IPFIND_PROVIDER_TIMEOUT_SECS"));
        std::env::remove_var("IPFIND_PROVIDER_TIMEOUT_SECS");
    }

    #[test]
    fn test_load_config_rejects_zero_request_timeout() {
        let _guard = env_guard();
        std::env::set_var("IPFIND_REQUEST_TIMEOUT_SECS", "0");
        let err = load_config().unwrap_err();
        assert!(err.to_string().contains("IPFIND_REQUEST_TIMEOUT_SECS"));
        std::env::remove_var("IPFIND_REQUEST_TIMEOUT_SECS");
    }

    #[test]
    fn test_load_config_with_urls() {
        let _guard = env_guard();
        std::env::set_var("IPFIND_IPAPI_CO_URL", "http://mirror/{ip}/json/");
        std::env::set_var("IPFIND_PUBLIC_IP_URL", "http://mirror/ip");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.ipapi_co_url.as_deref(), Some("http://mirror/{ip}/json/"));
        assert_eq!(cfg.public_ip_url, "http://mirror/ip");
        std::env::remove_var("IPFIND_IPAPI_CO_URL");
        std::env::remove_var("IPFIND_PUBLIC_IP_URL");
    }

    #[test]
    fn test_load_config_public_ipv6_url() {
        let _guard = env_guard();
        std::env::set_var("IPFIND_PUBLIC_IPV6_URL", "http://mirror/ip6");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.public_ipv6_url.as_deref(), Some("http://mirror/ip6"));

        std::env::set_var("IPFIND_PUBLIC_IPV6_URL", "");
        let cfg = load_config().unwrap();
        assert!(cfg.public_ipv6_url.is_none());

        std::env::remove_var("IPFIND_PUBLIC_IPV6_URL");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.public_ipv6_url.as_deref(), Some("https://api64.ipify.org"));
    }

    #[test]
    fn test_load_config_with_debug() {
        let _guard = env_guard();
        std::env::set_var("DEBUG", "1");
        let cfg = load_config().unwrap();
        assert!(cfg.debug);
        std::env::remove_var("DEBUG");
    }

    #[test]
    fn test_env_flag() {
        let _guard = env_guard();
        std::env::set_var("IPFIND_TEST_FLAG", "TRUE");
        assert!(env_flag("IPFIND_TEST_FLAG", false));
        std::env::set_var("IPFIND_TEST_FLAG", "no");
        assert!(!env_flag("IPFIND_TEST_FLAG", true));
        std::env::remove_var("IPFIND_TEST_FLAG");
        assert!(env_flag("IPFIND_TEST_FLAG", true));
    }
}
