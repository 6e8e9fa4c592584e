//! Supported Stripe actions.

use std::fmt;
use std::str::FromStr;

use saasbridge_client::RequestMethod;
use saasbridge_core::{Error, ErrorKind};

/// One runnable Stripe action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedAction {
    Checkout,
    CheckoutRetrieve,
    CustomerCreate,
    CustomerSearch,
    PaymentIntentCreate,
    SubscriptionList,
    SubscriptionRetrieve,
    SubscriptionUpdate,
}

impl SupportedAction {
    pub const ALL: [SupportedAction; 8] = [
        SupportedAction::Checkout,
        SupportedAction::CheckoutRetrieve,
        SupportedAction::CustomerCreate,
        SupportedAction::CustomerSearch,
        SupportedAction::PaymentIntentCreate,
        SupportedAction::SubscriptionList,
        SupportedAction::SubscriptionRetrieve,
        SupportedAction::SubscriptionUpdate,
    ];

    /// Action name as invoked.
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedAction::Checkout => "checkout",
            SupportedAction::CheckoutRetrieve => "checkout_retrieve",
            SupportedAction::CustomerCreate => "customer_create",
            SupportedAction::CustomerSearch => "customer_search",
            SupportedAction::PaymentIntentCreate => "paymentintent_create",
            SupportedAction::SubscriptionList => "subscription_list",
            SupportedAction::SubscriptionRetrieve => "subscription_retrieve",
            SupportedAction::SubscriptionUpdate => "subscription_update",
        }
    }

    /// Wording used in failure messages.
    pub fn description(&self) -> &'static str {
        match self {
            SupportedAction::Checkout => "checkout",
            SupportedAction::CheckoutRetrieve => "checkout retrieve",
            SupportedAction::CustomerCreate => "customer creation",
            SupportedAction::CustomerSearch => "customer search",
            SupportedAction::PaymentIntentCreate => "payment intent creation",
            SupportedAction::SubscriptionList => "subscription list",
            SupportedAction::SubscriptionRetrieve => "subscription retrieve",
            SupportedAction::SubscriptionUpdate => "subscription update",
        }
    }

    /// Key the response body is returned under.
    pub fn result_key(&self) -> &'static str {
        match self {
            SupportedAction::Checkout | SupportedAction::CheckoutRetrieve => "session",
            SupportedAction::CustomerCreate | SupportedAction::CustomerSearch => "customer",
            SupportedAction::PaymentIntentCreate => "payment_intent",
            SupportedAction::SubscriptionList => "subscriptions",
            SupportedAction::SubscriptionRetrieve | SupportedAction::SubscriptionUpdate => {
                "subscription"
            }
        }
    }

    pub fn method(&self) -> RequestMethod {
        match self {
            SupportedAction::Checkout
            | SupportedAction::CustomerCreate
            | SupportedAction::PaymentIntentCreate
            | SupportedAction::SubscriptionUpdate => RequestMethod::Post,
            SupportedAction::CheckoutRetrieve
            | SupportedAction::CustomerSearch
            | SupportedAction::SubscriptionList
            | SupportedAction::SubscriptionRetrieve => RequestMethod::Get,
        }
    }
}

impl fmt::Display for SupportedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupportedAction {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        SupportedAction::ALL
            .into_iter()
            .find(|action| action.as_str() == name)
            .ok_or_else(|| {
                Error::new(ErrorKind::UnsupportedOperation(format!(
                    "unsupported action name: {}",
                    name
                )))
            })
    }
}
