/// Vow Portal - client planning portal backend
///
/// Serves the token-gated planning portal couples fill in and the review
/// workflow photographers use to lock, approve or reopen each section.

mod api;
mod auth;
mod clock;
mod config;
mod context;
mod db;
mod error;
mod metrics;
mod portal;
mod rate_limit;
mod server;
mod store;

use config::PortalConfig;
use context::AppContext;
use error::PortalResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> PortalResult<()> {
    // Load configuration (reads .env first)
    let config = PortalConfig::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vow_portal={0},tower_http={0}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Vow Portal v{}", env!("CARGO_PKG_VERSION"));

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}
