// Widget instance model - per-widget options and size-driven layout
use super::space_weather::DataSourceKind;
use serde::{Deserialize, Serialize};

pub type WidgetId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSettings {
    pub show_title: bool,
    pub show_info_row: bool,
    pub source: DataSourceKind,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            show_title: true,
            show_info_row: true,
            source: DataSourceKind::KpIndex,
        }
    }
}

/// Widget size in density-independent pixels, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WidgetSize {
    fn default() -> Self {
        Self {
            width: 250,
            height: 110,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WidgetLayout {
    pub point_count: usize,
    pub title_visible: bool,
    pub info_row_visible: bool,
}

impl WidgetLayout {
    /// Narrow widgets get fewer bars; short widgets drop the title and then the
    /// info row regardless of the user's settings.
    pub fn for_size(size: WidgetSize, settings: &WidgetSettings) -> Self {
        let point_count = match size.width {
            w if w >= 300 => 24,
            w if w >= 200 => 16,
            w if w >= 120 => 8,
            _ => 4,
        };

        let (title_visible, info_row_visible) = match size.height {
            h if h <= 70 => (false, false),
            h if h <= 110 => (false, settings.show_info_row),
            _ => (settings.show_title, settings.show_info_row),
        };

        Self {
            point_count,
            title_visible,
            info_row_visible,
        }
    }
}
