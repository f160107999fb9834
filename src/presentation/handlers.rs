// HTTP request handlers
use crate::domain::widget::{WidgetId, WidgetSettings, WidgetSize};
use crate::infrastructure::image_cache::encode_png;
use crate::presentation::app_state::AppState;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const STATUS_HEADER: &str = "x-widget-status";

#[derive(Deserialize)]
pub struct SizeQuery {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl SizeQuery {
    fn into_size(self) -> WidgetSize {
        let default = WidgetSize::default();
        WidgetSize {
            width: self.width.unwrap_or(default.width),
            height: self.height.unwrap_or(default.height),
        }
    }
}

#[derive(Serialize)]
pub struct WidgetView {
    pub id: WidgetId,
    pub status: String,
    pub title_visible: bool,
    pub info_row_visible: bool,
    pub has_image: bool,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/widgets/:id", get(widget_view).delete(remove_widget))
        .route("/widgets/:id/refresh", post(refresh_widget))
        .route("/widgets/:id/chart.png", get(widget_chart))
        .route("/widgets/:id/settings", get(get_settings).put(put_settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Kick off a fetch-and-render cycle; the result lands on the display board.
pub async fn refresh_widget(
    Path(id): Path<WidgetId>,
    Query(size): Query<SizeQuery>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    state.widget_service.trigger(id, size.into_size());
    StatusCode::ACCEPTED
}

pub async fn widget_view(
    Path(id): Path<WidgetId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<WidgetView>, StatusCode> {
    let frame = state
        .widget_service
        .frame(id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(WidgetView {
        id,
        status: frame.status,
        title_visible: frame.layout.title_visible,
        info_row_visible: frame.layout.info_row_visible,
        has_image: frame.image.is_some(),
    }))
}

/// Current chart as PNG, with the status line in a response header.
pub async fn widget_chart(
    Path(id): Path<WidgetId>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(frame) = state.widget_service.frame(id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(image) = frame.image else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let png = match encode_png(&image) {
        Ok(png) => png,
        Err(e) => {
            tracing::error!("Failed to encode chart for widget {}: {}", id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response = ([(header::CONTENT_TYPE, "image/png")], png).into_response();
    // header values must be visible ASCII
    let status: String = frame.status.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect();
    if let Ok(value) = HeaderValue::from_str(&status) {
        response.headers_mut().insert(STATUS_HEADER, value);
    }
    response
}

pub async fn get_settings(
    Path(id): Path<WidgetId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<WidgetSettings>, StatusCode> {
    state.widget_service.settings(id).await.map(Json).map_err(|e| {
        tracing::error!("Failed to load settings for widget {}: {}", id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Save settings and redraw the widget at the given size.
pub async fn put_settings(
    Path(id): Path<WidgetId>,
    Query(size): Query<SizeQuery>,
    State(state): State<Arc<AppState>>,
    Json(settings): Json<WidgetSettings>,
) -> StatusCode {
    match state
        .widget_service
        .configure(id, settings, size.into_size())
        .await
    {
        Ok(_) => StatusCode::NO_CONTENT,
        Err(e) => {
            tracing::error!("Failed to save settings for widget {}: {}", id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn remove_widget(
    Path(id): Path<WidgetId>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    match state.widget_service.remove(id).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            tracing::error!("Failed to remove widget {}: {}", id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
