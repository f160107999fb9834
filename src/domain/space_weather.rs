// Space weather domain models
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One sample of a NOAA series, in the order the source delivered it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub time_tag: String,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(time_tag: impl Into<String>, value: f64) -> Self {
        Self {
            time_tag: time_tag.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSourceKind {
    #[default]
    KpIndex,
    ProtonFlux,
    XrayFlux,
}

impl DataSourceKind {
    pub const ALL: [DataSourceKind; 3] = [Self::KpIndex, Self::ProtonFlux, Self::XrayFlux];

    /// Stable position used by the flat settings store.
    pub fn ordinal(self) -> i64 {
        match self {
            Self::KpIndex => 0,
            Self::ProtonFlux => 1,
            Self::XrayFlux => 2,
        }
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.ordinal() == ordinal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::KpIndex => "kp-index",
            Self::ProtonFlux => "proton-flux",
            Self::XrayFlux => "xray-flux",
        }
    }

    pub fn scaling(self) -> ScalingPolicy {
        match self {
            Self::KpIndex => ScalingPolicy::linear(0.0, 9.0),
            Self::ProtonFlux => ScalingPolicy::logarithmic(1e-2, 1e5),
            Self::XrayFlux => ScalingPolicy::logarithmic(1e-9, 1e-3),
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown data source: {}", s))
    }
}

/// Vertical value domain of a chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingPolicy {
    pub min_value: f64,
    pub max_value: f64,
    pub use_log_scale: bool,
}

impl ScalingPolicy {
    const fn linear(min_value: f64, max_value: f64) -> Self {
        Self {
            min_value,
            max_value,
            use_log_scale: false,
        }
    }

    const fn logarithmic(min_value: f64, max_value: f64) -> Self {
        Self {
            min_value,
            max_value,
            use_log_scale: true,
        }
    }

    /// Map a raw value to a bar height fraction in `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.use_log_scale {
            if value <= 0.0 {
                return 0.0;
            }
            let log_min = self.min_value.log10();
            let log_max = self.max_value.log10();
            let log_value = value.max(self.min_value).log10();
            ((log_value - log_min) / (log_max - log_min)).clamp(0.0, 1.0)
        } else {
            (value / self.max_value).clamp(0.0, 1.0)
        }
    }
}
