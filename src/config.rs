// config.rs
use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub clerk_secret_key: Option<String>,
    pub bind_address: String,
    pub stripe_api_base: String,
    pub clerk_api_base: String,
    pub tolerance_secs: i64,
}

impl Config {
    // Missing secrets are not a startup error: every webhook request fails instead.
    pub fn load() -> Result<Self> {
        let tolerance_secs = parse_tolerance(non_empty("STRIPE_WEBHOOK_TOLERANCE_SECS"))?;

        Ok(Config {
            stripe_secret_key: non_empty("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: non_empty("STRIPE_WEBHOOK_SECRET"),
            clerk_secret_key: non_empty("CLERK_SECRET_KEY"),
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            clerk_api_base: env::var("CLERK_API_BASE")
                .unwrap_or_else(|_| "https://api.clerk.com".to_string()),
            tolerance_secs,
        })
    }

    pub fn secrets(&self) -> WebhookSecrets {
        WebhookSecrets {
            api_key: self.stripe_secret_key.clone(),
            signing_secret: self.stripe_webhook_secret.clone(),
        }
    }
}

/// The two Stripe secrets the dispatcher needs on every request.
#[derive(Debug, Clone, Default)]
pub struct WebhookSecrets {
    pub api_key: Option<String>,
    pub signing_secret: Option<String>,
}

impl WebhookSecrets {
    pub fn new(api_key: impl Into<String>, signing_secret: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            signing_secret: Some(signing_secret.into()),
        }
    }
}

/// Seconds of clock skew allowed on signed webhooks; `0` disables the check.
fn parse_tolerance(raw: Option<String>) -> Result<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_TOLERANCE_SECS);
    };

    let secs: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid STRIPE_WEBHOOK_TOLERANCE_SECS: {}", raw))?;
    if secs < 0 {
        anyhow::bail!("STRIPE_WEBHOOK_TOLERANCE_SECS must not be negative: {}", secs);
    }

    Ok(secs)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
