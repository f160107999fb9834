// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::widget_service::WidgetService;
use crate::infrastructure::chart_renderer::{ChartRenderer, ChartStyle};
use crate::infrastructure::config::load_widget_host_config;
use crate::infrastructure::display_board::DisplayBoard;
use crate::infrastructure::http_transport::ReqwestConnector;
use crate::infrastructure::image_cache::PngImageCache;
use crate::infrastructure::noaa_client::NoaaClient;
use crate::infrastructure::settings_store::JsonSettingsStore;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_widget_host_config().context("loading widget host configuration")?;

    // Create adapters (infrastructure layer)
    let connector = Arc::new(ReqwestConnector::new(&config.noaa)?);
    let source = Arc::new(NoaaClient::new(connector, config.noaa.clone()));
    let renderer = Arc::new(ChartRenderer::new(
        ChartStyle::dark(),
        config.chart.font_path.as_deref(),
    ));
    let settings = Arc::new(JsonSettingsStore::new(config.storage.settings_path.clone()));
    let cache = Arc::new(PngImageCache::new(config.storage.cache_dir.clone()));
    let display = Arc::new(DisplayBoard::new());

    // Create services (application layer)
    let widget_service = WidgetService::new(source, renderer, settings, cache, display);

    // Create application state
    let state = Arc::new(AppState { widget_service });

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {:?}", config.server.bind))?;
    tracing::info!("Starting solar-weather-widget service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(state)).await?;

    Ok(())
}
