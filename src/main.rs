use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use stripe_clerk_sync::{
    clerk::ClerkClient, config::Config, dispatcher::WebhookDispatcher, router,
    stripe::StripeClient, webhook::StripeSignatureVerifier, AppState, WEBHOOK_PATH,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::load()?;
    if config.stripe_secret_key.is_none() || config.stripe_webhook_secret.is_none() {
        warn!("Stripe secrets not configured, every webhook request will fail");
    }

    let dispatcher = WebhookDispatcher::new(
        config.secrets(),
        Arc::new(StripeSignatureVerifier::new(config.tolerance_secs)),
        Arc::new(StripeClient::new(&config.stripe_api_base)?),
        Arc::new(ClerkClient::new(
            &config.clerk_api_base,
            config.clerk_secret_key.clone(),
        )?),
    );

    let app = router(AppState { dispatcher });

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Server starting on {} ({})", config.bind_address, WEBHOOK_PATH);

    axum::serve(listener, app).await?;

    Ok(())
}
