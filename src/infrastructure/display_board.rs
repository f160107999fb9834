// In-memory display surface, one current frame per widget
use crate::application::widget_ports::{DisplaySink, WidgetFrame};
use crate::domain::widget::WidgetId;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Last presented frame wins; overlapping updates are not ordered.
#[derive(Default)]
pub struct DisplayBoard {
    frames: RwLock<HashMap<WidgetId, WidgetFrame>>,
}

impl DisplayBoard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DisplaySink for DisplayBoard {
    async fn present(&self, id: WidgetId, frame: WidgetFrame) {
        tracing::debug!("Widget {} status: {}", id, frame.status);
        self.frames.write().await.insert(id, frame);
    }

    async fn current(&self, id: WidgetId) -> Option<WidgetFrame> {
        self.frames.read().await.get(&id).cloned()
    }

    async fn clear(&self, id: WidgetId) {
        self.frames.write().await.remove(&id);
    }
}
