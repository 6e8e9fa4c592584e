//! The transport seam and its reqwest-backed implementation.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{HttpRequest, RequestBody};
use crate::response::{decode_body, HttpResponse};
use crate::retry::RetryPolicy;

/// Executes one outbound HTTP call.
///
/// A non-success status is returned as an [`HttpResponse`], never as an
/// error; `Err` means no usable response was obtained.
pub trait Transport: Send + Sync {
    /// Send the request and return the decoded response.
    fn request(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn request(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send {
        (**self).request(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn request(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send {
        (**self).request(request)
    }
}

/// HTTP transport with built-in retry, compression and bearer auth.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: reqwest::Client,
    config: ClientConfig,
    access_token: Option<String>,
}

impl HttpTransport {
    /// Create a transport for the given credentials with default configuration.
    pub fn new(credentials: &Credentials) -> Result<Self> {
        Self::with_config(credentials, ClientConfig::default())
    }

    /// Create a transport with a custom configuration.
    ///
    /// A base URL in the credentials must parse as an absolute URL.
    pub fn with_config(credentials: &Credentials, config: ClientConfig) -> Result<Self> {
        if let Some(base_url) = credentials.base_url() {
            url::Url::parse(base_url)?;
        }

        let builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.accept_compressed)
            .deflate(config.accept_compressed);

        let inner = builder
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self {
            inner,
            config,
            access_token: credentials.access_token().map(str::to_string),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a request, retrying rate limits, 5xx and connection failures.
    ///
    /// When retries run out on a retryable status, the last response is
    /// returned so the caller can report its body.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut retry_policy = self
            .config
            .retry
            .as_ref()
            .map(|c| RetryPolicy::new(c.clone()));

        loop {
            match self.execute_once(request).await {
                Ok(response)
                    if retry_policy
                        .as_ref()
                        .is_some_and(|policy| policy.retries_status(response.code)) =>
                {
                    let delay = retry_policy
                        .as_mut()
                        .and_then(|policy| policy.next_delay(response.retry_after()));
                    match delay {
                        Some(delay) => {
                            warn!(
                                status = response.code,
                                delay_ms = delay.as_millis(),
                                "Retryable status, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => return Ok(response),
                    }
                }
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() => {
                    let Some(policy) = retry_policy.as_mut() else {
                        return Err(err);
                    };
                    match policy.next_delay(None) {
                        Some(delay) => {
                            warn!(
                                attempt = policy.attempt(),
                                delay_ms = delay.as_millis(),
                                error = %err,
                                "Request failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            return Err(Error::with_source(
                                ErrorKind::RetriesExhausted {
                                    attempts: policy.attempt(),
                                },
                                err,
                            ));
                        }
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn execute_once(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut req = self
            .inner
            .request(request.method.to_reqwest(), request.url.as_str());

        let has_auth_header = request
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("authorization"));
        if let (Some(token), false) = (&self.access_token, has_auth_header) {
            req = req.bearer_auth(token);
        }

        for (name, value) in &self.config.default_headers {
            let overridden = request
                .headers
                .keys()
                .any(|own| own.eq_ignore_ascii_case(name));
            if !overridden {
                req = req.header(name.as_str(), value.as_str());
            }
        }
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(ref body) = request.body {
            req = match body {
                RequestBody::Json(value) => req.json(value),
                RequestBody::Form(pairs) => req.body(serde_urlencoded::to_string(pairs)?),
                RequestBody::Text(text) => req.body(text.clone()),
            };
        }

        if self.config.log_requests {
            debug!(method = %request.method, url = %request.url, "Sending request");
        }

        let response = req.send().await?;
        let code = response.status().as_u16();

        if self.config.log_requests {
            let content_length = response.content_length();
            if response.status().is_success() {
                debug!(status = code, content_length, "Response received");
            } else {
                info!(status = code, content_length, "Non-success response");
            }
        }

        let status = response.status().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        let text = response.text().await?;

        Ok(HttpResponse {
            code,
            status,
            headers,
            body: decode_body(&text),
        })
    }
}

impl Transport for HttpTransport {
    fn request(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send {
        async move { self.execute(&request).await }
    }
}
