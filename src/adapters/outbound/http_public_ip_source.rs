//! HTTP Public IP Source
//!
//! Implements PublicIpSource against a plain-text "what is my IP" service
//! such as api.ipify.org.

use crate::domain::ports::PublicIpSource;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// Default endpoint returning the caller's address as plain text.
pub const DEFAULT_PUBLIC_IP_URL: &str = "https://api.ipify.org";

/// Dual-stack endpoint; answers over IPv6 when the host has it.
pub const DEFAULT_PUBLIC_IPV6_URL: &str = "https://api64.ipify.org";

pub struct HttpPublicIpSource {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpPublicIpSource {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(5),
            client,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PublicIpSource for HttpPublicIpSource {
    async fn fetch(&self) -> Option<IpAddr> {
        let resp = match self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                tracing::warn!("public IP service returned {}", resp.status());
                return None;
            }
            Err(e) => {
                tracing::warn!("public IP service unreachable: {}", e);
                return None;
            }
        };

        let text = resp.text().await.ok()?;
        match text.trim().parse::<IpAddr>() {
            Ok(ip) => {
                tracing::debug!("public IP detected: {}", ip);
                Some(ip)
            }
            Err(_) => None,
        }
    }
}
