use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carecrm::config::Config;
use carecrm::middleware_layer::auth::GuardDecision;
use carecrm::navigation::TracingNavigator;
use carecrm::notice::TracingNotifier;
use carecrm::state::SessionContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let context = SessionContext::from_config(
        config,
        Arc::new(TracingNotifier),
        Arc::new(TracingNavigator),
    )
    .await?;
    context.start().await;

    if let (Ok(email), Ok(password)) = (std::env::var("CRM_EMAIL"), std::env::var("CRM_PASSWORD")) {
        if !context.store.is_authenticated().await {
            context.store.login(&email, &password).await?;
        }
    }

    match context.guard.check().await {
        GuardDecision::Allow | GuardDecision::Provisional => {}
        decision => {
            tracing::warn!("🚪 Not signed in ({:?}), nothing to show", decision);
            return Ok(());
        }
    }

    let Some(user) = context.store.current_user().await else {
        tracing::warn!("⚠️ Session has a token but no user profile");
        return Ok(());
    };

    let permissions = context.menus.permissions_for(&user.id).await?;
    for entry in permissions.command_index() {
        tracing::info!("📋 [{}] {} -> {}", entry.group, entry.name, entry.href);
    }

    Ok(())
}
