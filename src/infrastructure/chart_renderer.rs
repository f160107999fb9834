// Bar chart rendering with the plotters bitmap backend
use crate::application::widget_ports::RasterImage;
use crate::domain::chart_scale::{color_band, grid_levels, select_date_labels};
use crate::domain::space_weather::{DataSourceKind, SeriesPoint};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontStyle, register_font};
use std::path::Path;
use std::sync::OnceLock;

pub const CHART_WIDTH: u32 = 900;
pub const CHART_HEIGHT: u32 = 420;

const PADDING_LEFT: f64 = 35.0;
const PADDING_RIGHT: f64 = 15.0;
const PADDING_TOP: f64 = 15.0;
const PADDING_BOTTOM: f64 = 45.0;
const BAR_GAP: f64 = 2.0;
const AXIS_LABEL_X: i32 = 10;
const DATE_LABEL_OFFSET: f64 = 20.0;

/// Colors and text sizes of a chart.
#[derive(Clone, Copy, Debug)]
pub struct ChartStyle {
    pub background: RGBColor,
    pub grid: RGBColor,
    pub axis_text: RGBColor,
    pub date_text: RGBColor,
    pub placeholder_text: RGBColor,
    pub axis_font_px: f64,
    pub date_font_px: f64,
    pub placeholder_font_px: f64,
}

impl ChartStyle {
    pub const fn dark() -> Self {
        Self {
            background: RGBColor(0x1E, 0x1E, 0x1E),
            grid: RGBColor(0x44, 0x44, 0x44),
            axis_text: RGBColor(0xAA, 0xAA, 0xAA),
            date_text: RGBColor(0x8B, 0xC3, 0x4A),
            placeholder_text: RGBColor(0xFF, 0xFF, 0xFF),
            axis_font_px: 20.0,
            date_font_px: 24.0,
            placeholder_font_px: 18.0,
        }
    }
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self::dark()
    }
}

/// Everything one render needs, owned so it can move onto a blocking thread.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub points: Vec<SeriesPoint>,
    pub point_count: usize,
    pub source: DataSourceKind,
}

static BUNDLED_FONT: OnceLock<bool> = OnceLock::new();

/// ab_glyph does not discover system fonts, so DejaVu Sans ships with the binary.
fn register_bundled_font() -> bool {
    *BUNDLED_FONT.get_or_init(|| {
        let registered = register_font(
            "sans-serif",
            FontStyle::Normal,
            include_bytes!("../../assets/DejaVuSans.ttf"),
        )
        .is_ok();
        if !registered {
            tracing::error!("Bundled chart font could not be parsed");
        }
        registered
    })
}

/// Replace the bundled label font with the file at `path`.
fn register_override_font(path: &Path) -> bool {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Cannot read chart font {:?}, keeping bundled font: {}", path, e);
            return false;
        }
    };
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    if register_font("sans-serif", FontStyle::Normal, bytes).is_err() {
        tracing::warn!("Chart font {:?} is not a usable TrueType font, keeping bundled font", path);
        return false;
    }
    tracing::info!("Registered chart font {:?}", path);
    true
}

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

#[derive(Debug, Clone)]
pub struct ChartRenderer {
    style: ChartStyle,
    text_enabled: bool,
}

impl ChartRenderer {
    pub fn new(style: ChartStyle, font_path: Option<&Path>) -> Self {
        let bundled = register_bundled_font();
        let overridden = font_path.is_some_and(register_override_font);
        let text_enabled = bundled || overridden;
        if !text_enabled {
            tracing::warn!("No chart font available, labels will be omitted");
        }
        Self {
            style,
            text_enabled,
        }
    }

    /// Draw `points` as bars on a fixed-size canvas. Never fails: drawing
    /// errors are logged and whatever was drawn is returned.
    pub fn render(
        &self,
        points: &[SeriesPoint],
        point_count: usize,
        source: DataSourceKind,
    ) -> RasterImage {
        let mut buffer = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
        {
            let root =
                BitMapBackend::with_buffer(&mut buffer, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
            if let Err(e) = self.draw(&root, points, point_count, source) {
                tracing::warn!("Chart drawing for {} stopped early: {:?}", source, e);
            }
            if let Err(e) = root.present() {
                tracing::warn!("Chart buffer flush failed: {:?}", e);
            }
        }

        RasterImage::from_raw(CHART_WIDTH, CHART_HEIGHT, buffer)
            .unwrap_or_else(|| RasterImage::new(CHART_WIDTH, CHART_HEIGHT))
    }

    pub fn render_request(&self, request: &RenderRequest) -> RasterImage {
        self.render(&request.points, request.point_count, request.source)
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        points: &[SeriesPoint],
        point_count: usize,
        source: DataSourceKind,
    ) -> DrawResult<DB> {
        root.fill(&self.style.background)?;

        let width = CHART_WIDTH as f64;
        let height = CHART_HEIGHT as f64;

        if points.is_empty() {
            let style = ("sans-serif", self.style.placeholder_font_px)
                .into_font()
                .color(&self.style.placeholder_text)
                .pos(Pos::new(HPos::Center, VPos::Center));
            self.draw_text(root, "No data", (width / 2.0, height / 2.0), style);
            return Ok(());
        }

        let chart_width = width - PADDING_LEFT - PADDING_RIGHT;
        let chart_height = height - PADDING_TOP - PADDING_BOTTOM;
        let baseline = height - PADDING_BOTTOM;

        self.draw_grid(root, source, chart_height, baseline)?;

        let scaling = source.scaling();
        let slot = chart_width / points.len() as f64;
        // dense series shrink the gap so every bar stays inside the chart area
        let bar_width = slot - BAR_GAP.min(slot / 2.0);
        let bar_left = |index: usize| PADDING_LEFT + index as f64 * slot;

        for (index, point) in points.iter().enumerate() {
            let bar_height = scaling.normalize(point.value) * chart_height;
            let x = bar_left(index);
            let (r, g, b) = color_band(point.value, source).rgb;
            root.draw(&Rectangle::new(
                [
                    (x.round() as i32, (baseline - bar_height).round() as i32),
                    ((x + bar_width).round() as i32, baseline.round() as i32),
                ],
                RGBColor(r, g, b).filled(),
            ))?;
        }

        let date_style = ("sans-serif", self.style.date_font_px)
            .into_font()
            .color(&self.style.date_text)
            .pos(Pos::new(HPos::Center, VPos::Center));
        for label in select_date_labels(points, point_count) {
            let center = bar_left(label.index) + bar_width / 2.0;
            self.draw_text(
                root,
                &label.text,
                (center, baseline + DATE_LABEL_OFFSET),
                date_style.clone(),
            );
        }

        Ok(())
    }

    fn draw_grid<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        source: DataSourceKind,
        chart_height: f64,
        baseline: f64,
    ) -> DrawResult<DB> {
        let axis_style = ("sans-serif", self.style.axis_font_px)
            .into_font()
            .color(&self.style.axis_text)
            .pos(Pos::new(HPos::Left, VPos::Center));
        let right = CHART_WIDTH as f64 - PADDING_RIGHT;

        for (fraction, label) in grid_levels(source) {
            let y = (baseline - chart_height * fraction).round() as i32;
            root.draw(&PathElement::new(
                vec![(PADDING_LEFT as i32, y), (right as i32, y)],
                self.style.grid.stroke_width(1),
            ))?;
            if let Some(label) = label {
                self.draw_text(root, &label, (AXIS_LABEL_X as f64, y as f64), axis_style.clone());
            }
        }
        Ok(())
    }

    fn draw_text<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        text: &str,
        (x, y): (f64, f64),
        style: TextStyle<'_>,
    ) {
        if !self.text_enabled {
            return;
        }
        if let Err(e) = root.draw(&Text::new(text, (x.round() as i32, y.round() as i32), style)) {
            tracing::debug!("Skipping chart text {:?}: {:?}", text, e);
        }
    }
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(ChartStyle::dark(), None)
    }
}
