//! Transport configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::retry::RetryConfig;

/// Settings for one [`HttpTransport`](crate::HttpTransport).
///
/// Integrations differ mostly in which headers they need on every call
/// (`Stripe-Version`, `Sforce-Call-Options`, ...), so those live here
/// rather than on each request.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `None` sends every request exactly once.
    pub retry: Option<RetryConfig>,
    pub accept_compressed: bool,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
    /// Sent on every request unless the request sets the same header.
    pub default_headers: BTreeMap<String, String>,
    /// Emit a debug event per request and response.
    pub log_requests: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: Some(RetryConfig::default()),
            accept_compressed: true,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: crate::USER_AGENT.to_string(),
            default_headers: BTreeMap::new(),
            log_requests: true,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Defaults with the integration name in the User-Agent, e.g.
    /// `saasbridge-stripe/0.1.0`.
    pub fn for_integration(name: &str) -> ClientConfigBuilder {
        Self::builder().with_user_agent(format!(
            "saasbridge-{}/{}",
            name,
            env!("CARGO_PKG_VERSION")
        ))
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = Some(retry);
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.config.retry = None;
        self
    }

    /// Accept gzip/deflate compressed responses.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.config.accept_compressed = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a header sent on every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.config.log_requests = enabled;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
