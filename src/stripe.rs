// stripe.rs
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client};

use crate::events::Subscription;

/// Reads subscription objects back from the payment provider.
#[async_trait]
pub trait SubscriptionReader: Send + Sync {
    async fn retrieve_subscription(&self, api_key: &str, id: &str) -> Result<Subscription>;
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    base_url: String,
}

impl StripeClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("stripe-clerk-sync/1.0"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SubscriptionReader for StripeClient {
    async fn retrieve_subscription(&self, api_key: &str, id: &str) -> Result<Subscription> {
        let url = format!("{}/v1/subscriptions/{}", self.base_url, id);
        let response = self.client.get(&url).bearer_auth(api_key).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to get subscription {}: {}", id, response.status());
        }

        let subscription: Subscription = response.json().await?;
        Ok(subscription)
    }
}
