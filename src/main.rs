//! Trade Journal AI Server
//!
//! Serves the AI smoke-test endpoints backed by the structured query engine

use anyhow::{Context, Result};
use tracing::{info, warn};
use tradejournal_ai::utils::logging::init_logging;
use tradejournal_ai::{create_router, version_info, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Settings are read once; the credential never changes afterwards
    let settings = Settings::new().context("Failed to load settings")?;

    init_logging(&settings.logging)?;
    info!("{}", version_info());

    if !settings.has_api_key() {
        warn!("Missing GOOGLE_GENAI_API_KEY, AI endpoints will report a configuration error");
    }

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app = create_router(settings)?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 Trade Journal AI server started!");
    info!("📝 Health check: http://{}/health", addr);
    info!("🎨 AI smoke test: http://{}/api/ai-test", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start server: {}", e))?;

    Ok(())
}
