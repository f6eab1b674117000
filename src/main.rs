use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use bizlens::completion::HttpCompletion;
use bizlens::settings::Settings;
use bizlens::{server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bizlens=info,warp=info")),
        )
        .init();

    let settings = Settings::from_env();
    let completion = Arc::new(
        HttpCompletion::new(&settings.completion)
            .context("failed to build completion client")?,
    );

    let state = AppState::new(settings, completion);
    server::serve(state).await;

    Ok(())
}
