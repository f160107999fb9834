use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::space_weather::DataSourceKind;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct WidgetHostConfig {
    pub server: ServerSettings,
    pub noaa: NoaaSettings,
    pub storage: StorageSettings,
    pub chart: ChartSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NoaaSettings {
    pub kp_index_url: String,
    pub proton_flux_url: String,
    pub xray_flux_url: String,
    pub connect_timeout_secs: f64,
    pub read_timeout_secs: f64,
    pub user_agent: String,
}

impl Default for NoaaSettings {
    fn default() -> Self {
        Self {
            kp_index_url: "https://services.swpc.noaa.gov/products/noaa-planetary-k-index.json"
                .to_string(),
            proton_flux_url:
                "https://services.swpc.noaa.gov/json/goes/primary/integral-protons-plot-3-day.json"
                    .to_string(),
            xray_flux_url: "https://services.swpc.noaa.gov/json/goes/primary/xrays-3-day.json"
                .to_string(),
            connect_timeout_secs: 15.0,
            read_timeout_secs: 15.0,
            user_agent: "SolarWeatherWidget/1.0".to_string(),
        }
    }
}

impl NoaaSettings {
    pub fn endpoint(&self, source: DataSourceKind) -> &str {
        match source {
            DataSourceKind::KpIndex => &self.kp_index_url,
            DataSourceKind::ProtonFlux => &self.proton_flux_url,
            DataSourceKind::XrayFlux => &self.xray_flux_url,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.read_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageSettings {
    pub settings_path: PathBuf,
    pub cache_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("data/widget_settings.json"),
            cache_dir: PathBuf::from("data/cache"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ChartSettings {
    /// TrueType font replacing the bundled DejaVu Sans for axis and date labels.
    pub font_path: Option<PathBuf>,
}

/// `config/widget.toml` (optional) overlaid by `SOLAR_WIDGET__SECTION__KEY` variables.
pub fn load_widget_host_config() -> anyhow::Result<WidgetHostConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/widget").required(false))
        .add_source(config::Environment::with_prefix("SOLAR_WIDGET").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
