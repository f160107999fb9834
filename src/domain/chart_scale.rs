// Chart presentation rules: color bands, grid levels and date labels
use super::space_weather::{DataSourceKind, SeriesPoint};
use chrono::NaiveDateTime;

/// A discrete activity band and the bar color that represents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBand {
    pub name: &'static str,
    pub rgb: (u8, u8, u8),
}

impl ColorBand {
    const fn new(name: &'static str, rgb: u32) -> Self {
        Self {
            name,
            rgb: ((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8),
        }
    }
}

// Each entry applies while `value < bound`; the final band has no upper bound.
const KP_BANDS: &[(f64, ColorBand)] = &[
    (4.0, ColorBand::new("quiet", 0x4CAF50)),
    (6.0, ColorBand::new("moderate", 0xFFC107)),
    (8.0, ColorBand::new("active", 0xFF9800)),
];
const KP_TOP: ColorBand = ColorBand::new("storm", 0xF44336);

const PROTON_BANDS: &[(f64, ColorBand)] = &[
    (1.0, ColorBand::new("low", 0x2196F3)),
    (10.0, ColorBand::new("moderate", 0x1976D2)),
    (100.0, ColorBand::new("elevated", 0x1565C0)),
    (1000.0, ColorBand::new("high", 0x0D47A1)),
];
const PROTON_TOP: ColorBand = ColorBand::new("very-high", 0x311B92);

const XRAY_BANDS: &[(f64, ColorBand)] = &[
    (1e-7, ColorBand::new("a-b-class", 0x9C27B0)),
    (1e-6, ColorBand::new("c-class", 0x7B1FA2)),
    (1e-5, ColorBand::new("m-class", 0x6A1B9A)),
    (1e-4, ColorBand::new("x-class", 0xE91E63)),
];
const XRAY_TOP: ColorBand = ColorBand::new("extreme", 0xF44336);

/// Band for a value. Boundary values belong to the upper band.
pub fn color_band(value: f64, source: DataSourceKind) -> ColorBand {
    let (bands, top) = match source {
        DataSourceKind::KpIndex => (KP_BANDS, KP_TOP),
        DataSourceKind::ProtonFlux => (PROTON_BANDS, PROTON_TOP),
        DataSourceKind::XrayFlux => (XRAY_BANDS, XRAY_TOP),
    };
    bands
        .iter()
        .find(|(bound, _)| value < *bound)
        .map(|(_, band)| *band)
        .unwrap_or(top)
}

/// Horizontal reference lines as height fractions, with an optional axis label.
pub fn grid_levels(source: DataSourceKind) -> Vec<(f64, Option<String>)> {
    const KP_LEVELS: u32 = 9;
    const LOG_DIVISIONS: u32 = 5;

    if source.scaling().use_log_scale {
        (0..=LOG_DIVISIONS)
            .map(|i| (i as f64 / LOG_DIVISIONS as f64, None))
            .collect()
    } else {
        (0..=KP_LEVELS)
            .map(|i| (i as f64 / KP_LEVELS as f64, Some(i.to_string())))
            .collect()
    }
}

/// How many date labels fit under the chart for a widget showing `point_count` bars.
pub fn label_count_for_point_count(point_count: usize) -> usize {
    match point_count {
        n if n >= 16 => 5,
        n if n >= 8 => 4,
        _ => 3,
    }
}

const TIME_TAG_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a NOAA time tag. Kp rows carry `2024-05-10 03:00:00.000`, GOES rows
/// carry `2024-05-10T03:00:00Z`; anything after the seconds field is ignored.
pub fn parse_time_tag(time_tag: &str) -> Option<NaiveDateTime> {
    TIME_TAG_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_and_remainder(time_tag.trim(), format)
            .ok()
            .map(|(parsed, _)| parsed)
    })
}

pub fn format_date_label(time: &NaiveDateTime) -> String {
    time.format("%d.%m").to_string()
}

/// A date label placed under the bar at `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateLabel {
    pub index: usize,
    pub text: String,
}

/// Choose which bars get a date label.
///
/// Candidates are every `len / max_labels`-th bar. A candidate whose time tag
/// does not parse gets no label; a candidate whose text repeats the label shown
/// just before it is skipped.
pub fn select_date_labels(points: &[SeriesPoint], point_count: usize) -> Vec<DateLabel> {
    let max_labels = label_count_for_point_count(point_count);
    let stride = (points.len() / max_labels).max(1);

    let mut labels: Vec<DateLabel> = Vec::new();
    for (index, point) in points.iter().enumerate().step_by(stride) {
        let Some(time) = parse_time_tag(&point.time_tag) else {
            continue;
        };
        let text = format_date_label(&time);
        if labels.last().is_some_and(|last| last.text == text) {
            continue;
        }
        labels.push(DateLabel { index, text });
    }
    labels
}
