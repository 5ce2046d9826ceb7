//! Live HLS Translation Server
//!
//! Ingests a live stream, segments it into chunks, translates each chunk's
//! audio through a realtime speech-translation service, and republishes
//! per-language HLS streams.

mod config;
mod error;
mod http;
mod segmenter;
mod state;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hls_translate_lib::StreamLayout;

use crate::config::Args;
use crate::error::Result;
use crate::http::create_router;
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "hls-translate-server";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    tracing::info!("{} v{} starting", APP_NAME, VERSION);

    let args = Args::parse();
    let translate_config = args.load_translate_config();
    tracing::info!("Configuration loaded: {:?}", translate_config);

    let layout = StreamLayout::new(&args.root);
    std::fs::create_dir_all(layout.chunks_dir())?;
    std::fs::create_dir_all(layout.root().join("stream"))?;

    let state = Arc::new(AppState::new(layout, translate_config));
    let app = create_router(state.clone());

    tracing::info!("Starting HTTP server on {}", args.bind);
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize logging with tracing
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hls_translate_server=info,hls_translate_lib=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
