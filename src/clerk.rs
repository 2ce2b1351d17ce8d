// clerk.rs
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::json;

pub const PREMIUM_PLAN: &str = "premium";

/// Writes metadata onto user records in the identity provider.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn update_user(&self, user_id: &str, patch: &MetadataPatch) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMetadata {
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicMetadata {
    pub subscription_plan: Option<String>,
}

/// Private and public metadata changes applied in a single update call.
/// `None` fields serialize as `null`, which clears them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataPatch {
    pub private_metadata: PrivateMetadata,
    pub public_metadata: PublicMetadata,
}

impl MetadataPatch {
    pub fn premium(customer: Option<String>, subscription: Option<String>) -> Self {
        Self {
            private_metadata: PrivateMetadata {
                stripe_customer_id: customer,
                stripe_subscription_id: subscription,
            },
            public_metadata: PublicMetadata {
                subscription_plan: Some(PREMIUM_PLAN.to_string()),
            },
        }
    }

    pub fn cleared() -> Self {
        Self {
            private_metadata: PrivateMetadata {
                stripe_customer_id: None,
                stripe_subscription_id: None,
            },
            public_metadata: PublicMetadata {
                subscription_plan: None,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClerkClient {
    client: Client,
    base_url: String,
    secret_key: Option<String>,
}

impl ClerkClient {
    pub fn new(base_url: &str, secret_key: Option<String>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("stripe-clerk-sync/1.0"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }
}

#[async_trait]
impl IdentityStore for ClerkClient {
    async fn update_user(&self, user_id: &str, patch: &MetadataPatch) -> Result<()> {
        let secret_key = self
            .secret_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("CLERK_SECRET_KEY not set"))?;

        let url = format!("{}/v1/users/{}", self.base_url, user_id);
        let payload = json!({
            "private_metadata": patch.private_metadata,
            "public_metadata": patch.public_metadata,
        });

        let response = self
            .client
            .patch(&url)
            .bearer_auth(secret_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to update user {}: {}", user_id, response.status());
        }

        Ok(())
    }
}
