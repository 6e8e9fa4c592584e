//! # saasbridge-stripe
//!
//! Stripe run-actions: checkout sessions, customers, payment intents and
//! subscriptions.
//!
//! Each [`SupportedAction`] maps to one Stripe endpoint. Write actions send
//! `application/x-www-form-urlencoded` bodies with nested parameters in
//! bracket notation (`line_items[0][price]`). The response body is returned
//! through the [`ActionSink`](saasbridge_core::ActionSink) under the
//! action's result key.
//!
//! ```rust,ignore
//! use saasbridge_core::{ActionRequest, ActionResult};
//! use saasbridge_stripe::StripeAdapter;
//!
//! let request = ActionRequest::new("customer_search")
//!     .with_param("email", "jane@example.com".into());
//! let mut result = ActionResult::default();
//! adapter.run(&request, &mut result).await?;
//! let customers = &result.results["customer"];
//! ```

mod action;
mod adapter;
mod form;

pub use action::SupportedAction;
pub use adapter::{customer_search_query, StripeAdapter};
pub use form::form_pairs;

pub use saasbridge_core::{Error, ErrorKind, Result};
