// Decoding of NOAA SWPC JSON products into series points
use crate::application::errors::FetchError;
use crate::domain::space_weather::{DataSourceKind, SeriesPoint};
use serde_json::Value;

/// Decode a response body for `source`, keeping at most the last `limit` points.
pub fn parse_series(
    source: DataSourceKind,
    body: &str,
    limit: usize,
) -> Result<Vec<SeriesPoint>, FetchError> {
    let limit = limit.max(1);
    let payload: Value = serde_json::from_str(body).map_err(|e| {
        tracing::error!("Failed to parse {} JSON: {}", source, e);
        FetchError::InvalidPayload
    })?;

    match source {
        DataSourceKind::KpIndex => parse_kp_rows(&payload, limit),
        DataSourceKind::ProtonFlux | DataSourceKind::XrayFlux => {
            parse_flux_samples(&payload, limit)
        }
    }
}

/// `[["time_tag","Kp",...], ["2024-05-10 00:00:00.000","2.67",...], ...]`
fn parse_kp_rows(payload: &Value, limit: usize) -> Result<Vec<SeriesPoint>, FetchError> {
    let rows = payload
        .as_array()
        .ok_or_else(|| invalid_payload("Kp payload is not an array"))?;
    if rows.len() < 2 {
        return Err(invalid_payload(&format!(
            "Kp payload has no data rows ({} rows)",
            rows.len()
        )));
    }

    let points = rows[1..]
        .iter()
        .map(parse_kp_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(keep_last(points, limit))
}

fn parse_kp_row(row: &Value) -> Result<SeriesPoint, FetchError> {
    let cells = row
        .as_array()
        .ok_or_else(|| invalid_payload("Kp row is not an array"))?;
    let time_tag = cells
        .first()
        .and_then(cell_text)
        .ok_or_else(|| invalid_payload("Kp row has no time tag"))?;

    let value = match cells.get(1) {
        None | Some(Value::Null) => return Err(invalid_payload("Kp row has no value")),
        Some(cell) => cell_number(cell).unwrap_or(0.0),
    };

    Ok(SeriesPoint::new(time_tag, value))
}

/// `[{"time_tag":"2024-05-10T00:00:00Z","flux":0.31,...}, ...]`, typically one
/// sample per minute. Stride sampling brings it near `limit` points before the
/// suffix is taken.
fn parse_flux_samples(payload: &Value, limit: usize) -> Result<Vec<SeriesPoint>, FetchError> {
    let samples = payload
        .as_array()
        .ok_or_else(|| invalid_payload("Flux payload is not an array"))?;
    if samples.is_empty() {
        return Err(invalid_payload("Flux payload is empty"));
    }

    let stride = (samples.len() / limit).max(1);
    let mut points = Vec::with_capacity(samples.len() / stride + 1);
    for sample in samples.iter().step_by(stride) {
        let fields = sample
            .as_object()
            .ok_or_else(|| invalid_payload("Flux sample is not an object"))?;
        let time_tag = fields.get("time_tag").and_then(cell_text).unwrap_or_default();
        let flux = fields.get("flux").and_then(cell_number).unwrap_or(0.0);

        if !time_tag.is_empty() && flux > 0.0 {
            points.push(SeriesPoint::new(time_tag, flux));
        }
    }

    Ok(keep_last(points, limit))
}

fn invalid_payload(reason: &str) -> FetchError {
    tracing::error!("Invalid payload: {}", reason);
    FetchError::InvalidPayload
}

fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Numbers and numeric strings; anything else, or a non-finite result, is `None`.
fn cell_number(cell: &Value) -> Option<f64> {
    let value = match cell {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn keep_last(mut points: Vec<SeriesPoint>, limit: usize) -> Vec<SeriesPoint> {
    let start = points.len().saturating_sub(limit);
    points.split_off(start)
}
