// events.rs
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

pub const INVOICE_PAID: &str = "invoice.paid";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Metadata key naming the Clerk user a Stripe object belongs to.
pub const CLERK_USER_ID_KEY: &str = "clerk_user_id";

/// A verified Stripe event, reduced to what the dispatcher acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    InvoicePaid {
        customer: Option<String>,
        subscription: Option<String>,
        metadata: HashMap<String, String>,
    },
    SubscriptionDeleted {
        subscription_id: String,
    },
    Other(String),
}

impl BillingEvent {
    pub fn event_type(&self) -> &str {
        match self {
            BillingEvent::InvoicePaid { .. } => INVOICE_PAID,
            BillingEvent::SubscriptionDeleted { .. } => SUBSCRIPTION_DELETED,
            BillingEvent::Other(kind) => kind,
        }
    }

    /// Decodes the Stripe event envelope. Only the two handled types need a
    /// well-formed `data.object`; anything else becomes `Other`.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        let envelope: EventEnvelope = serde_json::from_str(payload)?;

        match envelope.event_type.as_str() {
            INVOICE_PAID => {
                let invoice: Invoice = serde_json::from_value(envelope.data.object)?;
                Ok(BillingEvent::InvoicePaid {
                    customer: invoice.customer,
                    subscription: invoice.subscription,
                    metadata: invoice
                        .subscription_details
                        .and_then(|details| details.metadata)
                        .unwrap_or_default(),
                })
            }
            SUBSCRIPTION_DELETED => {
                let subscription: Subscription = serde_json::from_value(envelope.data.object)?;
                Ok(BillingEvent::SubscriptionDeleted {
                    subscription_id: subscription.id,
                })
            }
            _ => Ok(BillingEvent::Other(envelope.event_type)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: Value,
}

#[derive(Debug, Deserialize)]
struct Invoice {
    customer: Option<String>,
    subscription: Option<String>,
    subscription_details: Option<SubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionDetails {
    metadata: Option<HashMap<String, String>>,
}

/// The subset of a Stripe subscription object this service reads.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Subscription {
    pub fn clerk_user_id(&self) -> Option<&str> {
        clerk_user_id(&self.metadata)
    }
}

pub fn clerk_user_id(metadata: &HashMap<String, String>) -> Option<&str> {
    metadata
        .get(CLERK_USER_ID_KEY)
        .map(String::as_str)
        .filter(|id| !id.is_empty())
}
