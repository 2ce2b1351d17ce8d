// dispatcher.rs
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::clerk::{IdentityStore, MetadataPatch};
use crate::config::WebhookSecrets;
use crate::error::DispatchError;
use crate::events::{self, BillingEvent, INVOICE_PAID, SUBSCRIPTION_DELETED};
use crate::stripe::SubscriptionReader;
use crate::webhook::SignatureVerifier;

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A metadata update was applied.
    Processed,
    /// Verified, but not an event type this service acts on.
    Ignored(String),
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    secrets: WebhookSecrets,
    verifier: Arc<dyn SignatureVerifier>,
    subscriptions: Arc<dyn SubscriptionReader>,
    identity: Arc<dyn IdentityStore>,
}

impl WebhookDispatcher {
    pub fn new(
        secrets: WebhookSecrets,
        verifier: Arc<dyn SignatureVerifier>,
        subscriptions: Arc<dyn SubscriptionReader>,
        identity: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            secrets,
            verifier,
            subscriptions,
            identity,
        }
    }

    /// Handles one webhook delivery. `body` must be the untouched request body.
    pub async fn handle(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<DispatchOutcome, DispatchError> {
        let result = self.dispatch(signature, body).await;
        if let Err(e) = &result {
            error!("Webhook rejected: {}", e);
        }
        result
    }

    async fn dispatch(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<DispatchOutcome, DispatchError> {
        let api_key = self
            .secrets
            .api_key
            .as_deref()
            .ok_or(DispatchError::ConfigurationMissing("STRIPE_SECRET_KEY"))?;
        let signing_secret = self
            .secrets
            .signing_secret
            .as_deref()
            .ok_or(DispatchError::ConfigurationMissing("STRIPE_WEBHOOK_SECRET"))?;

        let signature = signature.ok_or_else(|| {
            DispatchError::AuthenticationFailed("missing stripe-signature header".to_string())
        })?;

        // Stripe signs UTF-8 JSON; anything else cannot verify.
        let body = std::str::from_utf8(body).map_err(|_| {
            DispatchError::AuthenticationFailed("request body is not valid UTF-8".to_string())
        })?;

        let event = self
            .verifier
            .construct_event(body, signature, signing_secret)?;

        match event {
            BillingEvent::InvoicePaid {
                customer,
                subscription,
                metadata,
            } => {
                let user_id = events::clerk_user_id(&metadata).ok_or_else(|| {
                    DispatchError::UserResolutionFailed {
                        event_type: INVOICE_PAID.to_string(),
                    }
                })?;

                let patch = MetadataPatch::premium(customer, subscription);
                self.apply(INVOICE_PAID, user_id, &patch).await?;
            }
            BillingEvent::SubscriptionDeleted { subscription_id } => {
                let subscription = self
                    .subscriptions
                    .retrieve_subscription(api_key, &subscription_id)
                    .await
                    .map_err(|source| DispatchError::ExternalUpdateFailed {
                        event_type: SUBSCRIPTION_DELETED.to_string(),
                        source,
                    })?;

                let user_id = subscription.clerk_user_id().ok_or_else(|| {
                    DispatchError::UserResolutionFailed {
                        event_type: SUBSCRIPTION_DELETED.to_string(),
                    }
                })?;

                self.apply(SUBSCRIPTION_DELETED, user_id, &MetadataPatch::cleared())
                    .await?;
            }
            BillingEvent::Other(event_type) => {
                warn!(event_type = %event_type, "Unhandled event type");
                return Ok(DispatchOutcome::Ignored(event_type));
            }
        }

        Ok(DispatchOutcome::Processed)
    }

    async fn apply(
        &self,
        event_type: &str,
        user_id: &str,
        patch: &MetadataPatch,
    ) -> Result<(), DispatchError> {
        self.identity
            .update_user(user_id, patch)
            .await
            .map_err(|source| DispatchError::ExternalUpdateFailed {
                event_type: event_type.to_string(),
                source,
            })?;

        info!(event_type, user_id, "User metadata updated");
        Ok(())
    }
}
