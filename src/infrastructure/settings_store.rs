// Flat key-value settings file, one set of keys per widget id
use crate::application::widget_ports::{SettingsStore, StoreError};
use crate::domain::space_weather::DataSourceKind;
use crate::domain::widget::{WidgetId, WidgetSettings};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::sync::Mutex;

const KEY_SHOW_TITLE: &str = "show_title_";
const KEY_SHOW_INFO_ROW: &str = "show_info_row_";
const KEY_DATA_SOURCE: &str = "data_source_";

pub struct JsonSettingsStore {
    path: PathBuf,
    // serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_entries(&self) -> Result<Map<String, Value>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn key(prefix: &str, id: WidgetId) -> String {
    format!("{}{}", prefix, id)
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn load(&self, id: WidgetId) -> Result<WidgetSettings, StoreError> {
        let _guard = self.lock.lock().await;
        let entries = self.read_entries().await?;
        let defaults = WidgetSettings::default();

        let flag = |prefix: &str, default: bool| {
            entries
                .get(&key(prefix, id))
                .and_then(Value::as_bool)
                .unwrap_or(default)
        };
        let source = entries
            .get(&key(KEY_DATA_SOURCE, id))
            .and_then(Value::as_i64)
            .and_then(DataSourceKind::from_ordinal)
            .unwrap_or(defaults.source);

        Ok(WidgetSettings {
            show_title: flag(KEY_SHOW_TITLE, defaults.show_title),
            show_info_row: flag(KEY_SHOW_INFO_ROW, defaults.show_info_row),
            source,
        })
    }

    async fn save(&self, id: WidgetId, settings: &WidgetSettings) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.insert(key(KEY_SHOW_TITLE, id), Value::Bool(settings.show_title));
        entries.insert(key(KEY_SHOW_INFO_ROW, id), Value::Bool(settings.show_info_row));
        entries.insert(key(KEY_DATA_SOURCE, id), Value::from(settings.source.ordinal()));
        self.write_entries(&entries).await?;

        tracing::debug!("Saved settings for widget {}: {:?}", id, settings);
        Ok(())
    }

    async fn delete(&self, id: WidgetId) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        let before = entries.len();
        for prefix in [KEY_SHOW_TITLE, KEY_SHOW_INFO_ROW, KEY_DATA_SOURCE] {
            entries.remove(&key(prefix, id));
        }
        if entries.len() != before {
            self.write_entries(&entries).await?;
        }
        Ok(())
    }
}
