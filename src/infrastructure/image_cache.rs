// PNG cache of the last successful render per widget
use crate::application::widget_ports::{ImageCache, RasterImage, StoreError};
use crate::domain::widget::WidgetId;
use async_trait::async_trait;
use image::ImageFormat;
use std::io::Cursor;
use std::path::PathBuf;

pub struct PngImageCache {
    dir: PathBuf,
}

impl PngImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: WidgetId) -> PathBuf {
        self.dir.join(format!("widget_chart_{}.png", id))
    }
}

#[async_trait]
impl ImageCache for PngImageCache {
    async fn load(&self, id: WidgetId) -> Option<RasterImage> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::error!("Failed to read cached chart for widget {}: {}", id, e);
                return None;
            }
        };

        match image::load_from_memory_with_format(&bytes, ImageFormat::Png) {
            Ok(decoded) => Some(decoded.to_rgb8()),
            Err(e) => {
                tracing::error!("Failed to decode cached chart {:?}: {}", path, e);
                None
            }
        }
    }

    async fn store(&self, id: WidgetId, image: &RasterImage) -> Result<(), StoreError> {
        let png = encode_png(image)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(id), png).await?;
        Ok(())
    }

    async fn remove(&self, id: WidgetId) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &RasterImage) -> Result<Vec<u8>, StoreError> {
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}
