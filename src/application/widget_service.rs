// Widget service - fetch, render, cache and present one widget
use crate::application::errors::FetchError;
use crate::application::space_weather_source::SpaceWeatherSource;
use crate::application::widget_ports::{
    DisplaySink, ImageCache, RasterImage, SettingsStore, StoreError, WidgetFrame,
};
use crate::domain::widget::{WidgetId, WidgetLayout, WidgetSettings, WidgetSize};
use crate::infrastructure::chart_renderer::{ChartRenderer, RenderRequest};
use std::sync::Arc;
use tokio::task::JoinHandle;

const STATUS_LOADING: &str = "Loading…";

#[derive(Clone)]
pub struct WidgetService {
    source: Arc<dyn SpaceWeatherSource>,
    renderer: Arc<ChartRenderer>,
    settings: Arc<dyn SettingsStore>,
    cache: Arc<dyn ImageCache>,
    display: Arc<dyn DisplaySink>,
}

impl WidgetService {
    pub fn new(
        source: Arc<dyn SpaceWeatherSource>,
        renderer: Arc<ChartRenderer>,
        settings: Arc<dyn SettingsStore>,
        cache: Arc<dyn ImageCache>,
        display: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            source,
            renderer,
            settings,
            cache,
            display,
        }
    }

    /// Start an update in the background. Overlapping triggers for the same
    /// widget are not deduplicated; whichever finishes last is displayed.
    pub fn trigger(&self, id: WidgetId, size: WidgetSize) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            // failures are already logged and shown on the widget
            let _ = service.update(id, size).await;
        })
    }

    pub async fn update(&self, id: WidgetId, size: WidgetSize) -> Result<(), FetchError> {
        let settings = self.settings_or_default(id).await;
        let layout = WidgetLayout::for_size(size, &settings);

        // show the last good chart while the fetch is in flight
        let cached = self.cache.load(id).await;
        self.display
            .present(
                id,
                WidgetFrame {
                    image: cached.clone(),
                    status: STATUS_LOADING.to_string(),
                    layout,
                },
            )
            .await;

        let points = match self.source.fetch(settings.source, layout.point_count).await {
            Ok(points) => points,
            Err(err) => {
                tracing::error!("Widget update failed for widget {}: {}", id, err);
                self.present_status(id, cached, err.status_text(), layout).await;
                return Err(err);
            }
        };

        let request = RenderRequest {
            points,
            point_count: layout.point_count,
            source: settings.source,
        };
        let renderer = self.renderer.clone();
        let image = match tokio::task::spawn_blocking(move || renderer.render_request(&request)).await {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("Chart render task for widget {} failed: {}", id, e);
                let err = FetchError::Unclassified(e.to_string());
                self.present_status(id, cached, err.status_text(), layout).await;
                return Err(err);
            }
        };

        if let Err(e) = self.cache.store(id, &image).await {
            tracing::error!("Failed to cache chart for widget {}: {}", id, e);
        }

        let status = format!("Updated at {}", chrono::Local::now().format("%H:%M"));
        tracing::info!("Widget {} updated with {} data", id, settings.source);
        self.display
            .present(
                id,
                WidgetFrame {
                    image: Some(image),
                    status,
                    layout,
                },
            )
            .await;
        Ok(())
    }

    pub async fn settings(&self, id: WidgetId) -> Result<WidgetSettings, StoreError> {
        self.settings.load(id).await
    }

    /// Save settings, then redraw the widget with them in the background.
    pub async fn configure(
        &self,
        id: WidgetId,
        settings: WidgetSettings,
        size: WidgetSize,
    ) -> Result<JoinHandle<()>, StoreError> {
        self.settings.save(id, &settings).await?;
        tracing::info!("Widget {} configured for {}", id, settings.source);
        Ok(self.trigger(id, size))
    }

    /// Forget a widget: cached chart, settings and displayed frame.
    pub async fn remove(&self, id: WidgetId) -> Result<(), StoreError> {
        self.cache.remove(id).await?;
        self.settings.delete(id).await?;
        self.display.clear(id).await;
        tracing::info!("Removed widget {}", id);
        Ok(())
    }

    pub async fn frame(&self, id: WidgetId) -> Option<WidgetFrame> {
        self.display.current(id).await
    }

    async fn settings_or_default(&self, id: WidgetId) -> WidgetSettings {
        match self.settings.load(id).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Using default settings for widget {}: {}", id, e);
                WidgetSettings::default()
            }
        }
    }

    async fn present_status(
        &self,
        id: WidgetId,
        image: Option<RasterImage>,
        status: &str,
        layout: WidgetLayout,
    ) {
        self.display
            .present(
                id,
                WidgetFrame {
                    image,
                    status: status.to_string(),
                    layout,
                },
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::space_weather::{DataSourceKind, SeriesPoint};
    use crate::infrastructure::chart_renderer::{CHART_HEIGHT, CHART_WIDTH};
    use crate::infrastructure::display_board::DisplayBoard;
    use async_trait::async_trait;
    use image::Rgb;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeSource {
        result: Result<Vec<SeriesPoint>, FetchError>,
        calls: Mutex<Vec<(DataSourceKind, usize)>>,
    }

    impl FakeSource {
        fn new(result: Result<Vec<SeriesPoint>, FetchError>) -> Self {
            Self {
                result,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SpaceWeatherSource for FakeSource {
        async fn fetch(
            &self,
            source: DataSourceKind,
            limit: usize,
        ) -> Result<Vec<SeriesPoint>, FetchError> {
            self.calls.lock().unwrap().push((source, limit));
            self.result.clone()
        }
    }

    #[derive(Default)]
    struct MemorySettings {
        entries: Mutex<HashMap<WidgetId, WidgetSettings>>,
    }

    #[async_trait]
    impl SettingsStore for MemorySettings {
        async fn load(&self, id: WidgetId) -> Result<WidgetSettings, StoreError> {
            Ok(self.entries.lock().unwrap().get(&id).copied().unwrap_or_default())
        }

        async fn save(&self, id: WidgetId, settings: &WidgetSettings) -> Result<(), StoreError> {
            self.entries.lock().unwrap().insert(id, *settings);
            Ok(())
        }

        async fn delete(&self, id: WidgetId) -> Result<(), StoreError> {
            self.entries.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryCache {
        images: Mutex<HashMap<WidgetId, RasterImage>>,
    }

    #[async_trait]
    impl ImageCache for MemoryCache {
        async fn load(&self, id: WidgetId) -> Option<RasterImage> {
            self.images.lock().unwrap().get(&id).cloned()
        }

        async fn store(&self, id: WidgetId, image: &RasterImage) -> Result<(), StoreError> {
            self.images.lock().unwrap().insert(id, image.clone());
            Ok(())
        }

        async fn remove(&self, id: WidgetId) -> Result<(), StoreError> {
            self.images.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    /// Keeps every presented status so the loading frame can be observed.
    #[derive(Default)]
    struct RecordingDisplay {
        board: DisplayBoard,
        statuses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DisplaySink for RecordingDisplay {
        async fn present(&self, id: WidgetId, frame: WidgetFrame) {
            self.statuses.lock().unwrap().push(frame.status.clone());
            self.board.present(id, frame).await;
        }

        async fn current(&self, id: WidgetId) -> Option<WidgetFrame> {
            self.board.current(id).await
        }

        async fn clear(&self, id: WidgetId) {
            self.board.clear(id).await;
        }
    }

    struct Harness {
        service: WidgetService,
        source: Arc<FakeSource>,
        settings: Arc<MemorySettings>,
        cache: Arc<MemoryCache>,
        display: Arc<RecordingDisplay>,
    }

    fn harness(result: Result<Vec<SeriesPoint>, FetchError>) -> Harness {
        let source = Arc::new(FakeSource::new(result));
        let settings = Arc::new(MemorySettings::default());
        let cache = Arc::new(MemoryCache::default());
        let display = Arc::new(RecordingDisplay::default());
        let service = WidgetService::new(
            source.clone(),
            Arc::new(ChartRenderer::default()),
            settings.clone(),
            cache.clone(),
            display.clone(),
        );
        Harness {
            service,
            source,
            settings,
            cache,
            display,
        }
    }

    fn kp_points() -> Vec<SeriesPoint> {
        vec![
            SeriesPoint::new("2024-05-10 00:00:00.000", 2.0),
            SeriesPoint::new("2024-05-10 03:00:00.000", 5.33),
            SeriesPoint::new("2024-05-11 06:00:00.000", 8.0),
        ]
    }

    fn stale_image() -> RasterImage {
        RasterImage::from_pixel(4, 4, Rgb([1, 2, 3]))
    }

    #[tokio::test]
    async fn test_successful_update_renders_caches_and_presents() {
        let h = harness(Ok(kp_points()));
        let size = WidgetSize { width: 320, height: 180 };

        h.service.update(1, size).await.unwrap();

        let frame = h.service.frame(1).await.unwrap();
        let image = frame.image.unwrap();
        assert_eq!(image.dimensions(), (CHART_WIDTH, CHART_HEIGHT));
        assert!(frame.status.starts_with("Updated at "));
        assert!(frame.layout.title_visible);
        assert_eq!(h.cache.load(1).await, Some(image));
        assert_eq!(h.display.statuses.lock().unwrap()[0], STATUS_LOADING);
        assert_eq!(
            h.source.calls.lock().unwrap().as_slice(),
            [(DataSourceKind::KpIndex, 24)]
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_cached_chart_and_shows_error() {
        let h = harness(Err(FetchError::ServerRejected));
        h.cache.store(2, &stale_image()).await.unwrap();

        let result = h.service.update(2, WidgetSize::default()).await;
        assert_eq!(result, Err(FetchError::ServerRejected));

        let frame = h.service.frame(2).await.unwrap();
        assert_eq!(frame.image, Some(stale_image()));
        assert_eq!(frame.status, "Server error");
        assert_eq!(h.cache.load(2).await, Some(stale_image()));
    }

    #[tokio::test]
    async fn test_failure_without_cache_shows_error_only() {
        let h = harness(Err(FetchError::NoConnectivity));

        let _ = h.service.update(3, WidgetSize::default()).await;

        let frame = h.service.frame(3).await.unwrap();
        assert!(frame.image.is_none());
        assert_eq!(frame.status, "No internet connection");
        assert_eq!(
            h.display.statuses.lock().unwrap().as_slice(),
            [STATUS_LOADING, "No internet connection"]
        );
    }

    #[tokio::test]
    async fn test_settings_choose_source_and_width_chooses_limit() {
        let h = harness(Ok(vec![]));
        h.settings
            .save(
                4,
                &WidgetSettings {
                    source: DataSourceKind::ProtonFlux,
                    ..WidgetSettings::default()
                },
            )
            .await
            .unwrap();

        h.service.update(4, WidgetSize { width: 130, height: 60 }).await.unwrap();

        assert_eq!(
            h.source.calls.lock().unwrap().as_slice(),
            [(DataSourceKind::ProtonFlux, 8)]
        );
        let frame = h.service.frame(4).await.unwrap();
        assert!(!frame.layout.title_visible);
        assert!(!frame.layout.info_row_visible);
        // an empty series still yields a placeholder chart
        assert!(frame.image.is_some());
    }

    #[tokio::test]
    async fn test_trigger_runs_in_background() {
        let h = harness(Ok(kp_points()));
        h.service.trigger(5, WidgetSize::default()).await.unwrap();
        assert!(h.service.frame(5).await.unwrap().image.is_some());
    }

    #[tokio::test]
    async fn test_remove_forgets_widget() {
        let h = harness(Ok(kp_points()));
        h.service
            .configure(6, WidgetSettings::default(), WidgetSize::default())
            .await
            .unwrap()
            .await
            .unwrap();

        h.service.remove(6).await.unwrap();

        assert!(h.service.frame(6).await.is_none());
        assert!(h.cache.load(6).await.is_none());
        assert!(h.settings.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_configure_redraws_with_new_source() {
        let h = harness(Ok(kp_points()));
        h.service.update(7, WidgetSize::default()).await.unwrap();

        let refresh = h
            .service
            .configure(
                7,
                WidgetSettings {
                    source: DataSourceKind::XrayFlux,
                    ..WidgetSettings::default()
                },
                WidgetSize { width: 210, height: 150 },
            )
            .await
            .unwrap();
        refresh.await.unwrap();

        assert_eq!(
            h.source.calls.lock().unwrap().as_slice(),
            [(DataSourceKind::KpIndex, 16), (DataSourceKind::XrayFlux, 16)]
        );
        let frame = h.service.frame(7).await.unwrap();
        assert!(frame.status.starts_with("Updated at "));
        assert_eq!(frame.layout.point_count, 16);
    }
}
