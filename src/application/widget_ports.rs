// Collaborator traits around the widget pipeline
use crate::domain::widget::{WidgetId, WidgetLayout, WidgetSettings};
use async_trait::async_trait;
use thiserror::Error;

pub type RasterImage = image::RgbImage;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image codec failed: {0}")]
    Image(#[from] image::ImageError),
}

/// What the display currently shows for one widget.
#[derive(Debug, Clone)]
pub struct WidgetFrame {
    pub image: Option<RasterImage>,
    pub status: String,
    pub layout: WidgetLayout,
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Missing entries come back as defaults.
    async fn load(&self, id: WidgetId) -> Result<WidgetSettings, StoreError>;
    async fn save(&self, id: WidgetId, settings: &WidgetSettings) -> Result<(), StoreError>;
    async fn delete(&self, id: WidgetId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ImageCache: Send + Sync {
    async fn load(&self, id: WidgetId) -> Option<RasterImage>;
    async fn store(&self, id: WidgetId, image: &RasterImage) -> Result<(), StoreError>;
    async fn remove(&self, id: WidgetId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait DisplaySink: Send + Sync {
    async fn present(&self, id: WidgetId, frame: WidgetFrame);
    async fn current(&self, id: WidgetId) -> Option<WidgetFrame>;
    async fn clear(&self, id: WidgetId);
}
