//! Stripe action runner.

use tracing::{debug, info, instrument, warn};

use saasbridge_client::security::url as url_security;
use saasbridge_client::{Credentials, HttpRequest, Transport};
use saasbridge_core::{value_to_id, ActionRequest, ActionSink, Error, ErrorKind, Result};

use crate::action::SupportedAction;
use crate::form::form_pairs;

/// Runs [`SupportedAction`]s against the Stripe API.
///
/// The base URL (`https://api.stripe.com`) and secret key come from the
/// credentials; the key is sent as a bearer token by the transport.
#[derive(Debug, Clone)]
pub struct StripeAdapter<T> {
    transport: T,
    credentials: Credentials,
}

impl<T: Transport> StripeAdapter<T> {
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    /// Run an action, reporting the response body under the action's
    /// result key.
    ///
    /// Unknown actions fail before any request is made. A non-200
    /// response is reported through the sink.
    #[instrument(skip(self, request, sink), fields(action = %request.action_name))]
    pub async fn run<S>(&self, request: &ActionRequest, sink: &mut S) -> Result<()>
    where
        S: ActionSink + ?Sized,
    {
        let action: SupportedAction = request.action_name.parse()?;
        let http = self.build_request(action, request)?;
        info!(method = %http.method, "Running Stripe action");

        let response = self.transport.request(http).await?;
        debug!(code = response.code, status = %response.status, "Action response");

        if response.code != 200 {
            warn!(code = response.code, message = ?response.error_message(), "Stripe action failed");
            sink.add_error(format!(
                "could not complete {}: {}",
                action.description(),
                response.code
            ));
            return Ok(());
        }
        sink.add_result(action.result_key(), response.body);
        Ok(())
    }

    /// The HTTP request an action would send.
    pub fn build_request(&self, action: SupportedAction, request: &ActionRequest) -> Result<HttpRequest> {
        let base_url = self.credentials.require_base_url()?;
        let http = match action {
            SupportedAction::Checkout => HttpRequest::post(format!("{}/v1/checkout/sessions", base_url))
                .form(params(
                    request,
                    &[
                        ("mode", &["mode"]),
                        ("success_url", &["success_url", "successURL"]),
                        ("cancel_url", &["cancel_url", "cancelURL"]),
                        ("customer", &["customer"]),
                        ("currency", &["currency"]),
                        ("line_items", &["items"]),
                    ],
                )),
            SupportedAction::CheckoutRetrieve => HttpRequest::get(format!(
                "{}/v1/checkout/sessions/{}",
                base_url,
                url_security::encode_param(&required_id(request)?)
            )),
            SupportedAction::CustomerCreate => HttpRequest::post(format!("{}/v1/customers", base_url))
                .form(params(
                    request,
                    &[("name", &["name"]), ("email", &["email"]), ("metadata", &["metadata"])],
                )),
            SupportedAction::CustomerSearch => HttpRequest::get(format!(
                "{}/v1/customers/search?query={}",
                base_url,
                url_security::encode_param(&customer_search_query(request))
            )),
            SupportedAction::PaymentIntentCreate => {
                HttpRequest::post(format!("{}/v1/payment_intents", base_url)).form(params(
                    request,
                    &[
                        ("amount", &["amount"]),
                        ("currency", &["currency"]),
                        ("payment_method", &["payment_method", "paymentMethod"]),
                        ("customer", &["customer"]),
                    ],
                ))
            }
            SupportedAction::SubscriptionList => {
                let mut url = format!("{}/v1/subscriptions", base_url);
                if let Some(customer) = request.param("customer").and_then(value_to_id) {
                    url.push_str("?customer=");
                    url.push_str(&url_security::encode_param(&customer));
                }
                HttpRequest::get(url)
            }
            SupportedAction::SubscriptionRetrieve => HttpRequest::get(format!(
                "{}/v1/subscriptions/{}",
                base_url,
                url_security::encode_param(&required_id(request)?)
            )),
            SupportedAction::SubscriptionUpdate => HttpRequest::post(format!(
                "{}/v1/subscriptions/{}",
                base_url,
                url_security::encode_param(&required_id(request)?)
            ))
            .form(params(request, &[("items", &["items"])])),
        };
        debug_assert_eq!(http.method, action.method());
        Ok(http)
    }
}

/// Form pairs for `(form name, accepted parameter names)`; the first
/// parameter present wins.
fn params(request: &ActionRequest, fields: &[(&str, &[&str])]) -> Vec<(String, String)> {
    form_pairs(fields.iter().filter_map(|(form_name, names)| {
        names
            .iter()
            .find_map(|name| request.param(name))
            .map(|value| (*form_name, value))
    }))
}

fn required_id(request: &ActionRequest) -> Result<String> {
    request.param("id").and_then(value_to_id).ok_or_else(|| {
        Error::new(ErrorKind::Other(format!(
            "{} requires an id parameter",
            request.action_name
        )))
    })
}

/// Stripe search query for the `name`, `email` and `uniquekey` params,
/// joined with `AND`.
pub fn customer_search_query(request: &ActionRequest) -> String {
    let mut clauses = Vec::new();
    if let Some(name) = request.param_str("name").filter(|s| !s.is_empty()) {
        clauses.push(format!("name:\"{}\"", escape_quoted(name, '"')));
    }
    if let Some(email) = request.param_str("email").filter(|s| !s.is_empty()) {
        clauses.push(format!("email:\"{}\"", escape_quoted(email, '"')));
    }
    if let Some(key) = request.param_str("uniquekey").filter(|s| !s.is_empty()) {
        clauses.push(format!(
            "metadata['uesio/core.uniquekey']:'{}'",
            escape_quoted(key, '\'')
        ));
    }
    clauses.join(" AND ")
}

fn escape_quoted(value: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '\\' || ch == quote {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
