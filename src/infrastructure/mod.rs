// Infrastructure layer - External dependencies and adapters
pub mod chart_renderer;
pub mod config;
pub mod display_board;
pub mod http_transport;
pub mod image_cache;
pub mod noaa_client;
pub mod noaa_payload;
pub mod settings_store;
