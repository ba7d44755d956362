//! Dashboard web UI, JSON control API and Prometheus endpoint.

pub mod metrics;
pub mod state;
pub mod view;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use minijinja::{Environment, context};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::color::{NativeColor, Pointer, Rgb, WidgetRect};
use crate::error::DashboardError;
use crate::plugs::PlugControls;
use crate::policy::{ColorOutcome, DeferredColorPolicy};
use crate::registry::{DeviceKind, DeviceRegistry};
use crate::selection::ColorSelection;
use crate::settings::DEFAULT_WEB_PORT;
use crate::web::metrics::Metrics;
use crate::web::state::{DashboardState, SyncStatus};
use crate::web::view::{LampView, PlugView, project};

/// Seconds without a finished tick before `/health` reports a stall.
const STALE_TICK_SECONDS: u64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub controls: Controls,
    pub metrics_handle: PrometheusHandle,
    pub templates: Arc<RwLock<Environment<'static>>>,
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub port: u16,
    pub enabled: bool,
    /// Directory served under `/static`.
    pub static_dir: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_WEB_PORT,
            enabled: true,
            static_dir: "static".to_string(),
        }
    }
}

/// Session objects the handlers act on.
#[derive(Clone)]
pub struct Controls {
    pub registry: DeviceRegistry,
    pub selection: ColorSelection,
    pub lamps: DeferredColorPolicy,
    pub plugs: PlugControls,
    pub dashboard: DashboardState,
}

fn templates() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("base.html", include_str!("../../templates/base.html"))?;
    env.add_template("index.html", include_str!("../../templates/index.html"))?;
    Ok(env)
}

pub fn router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/status", get(api_status_handler))
        .route("/api/devices", get(api_devices_handler))
        .route("/api/plugs/{id}/toggle", post(plug_toggle_handler))
        .route("/api/lamps/{id}/power", post(lamp_power_handler))
        .route("/api/lamps/{id}/brightness", post(lamp_brightness_handler))
        .route("/api/lamps/{id}/target", post(lamp_target_handler))
        .route("/api/target", delete(clear_target_handler))
        .route("/api/wheel/pointer", post(wheel_pointer_handler))
        .route("/api/wheel/click", post(wheel_click_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Spawn the web server in the background.
pub async fn start_web_server(config: WebConfig, controls: Controls) -> anyhow::Result<()> {
    if !config.enabled {
        info!("Web UI is disabled");
        return Ok(());
    }

    let metrics_handle = metrics::init_metrics()?;
    let app_state = AppState {
        controls,
        metrics_handle,
        templates: Arc::new(RwLock::new(templates()?)),
    };
    let app = router(app_state, &config.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting web server on http://{addr}");
    let listener = TcpListener::bind(addr).await?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {e}");
        }
    });

    Ok(())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl DashboardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::RemoteWrite(_) => StatusCode::BAD_GATEWAY,
            DashboardError::OutOfRange(..) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, DashboardError>;

impl AppState {
    fn remember<T>(&self, result: ApiResult<T>) -> ApiResult<T> {
        if let Err(e) = &result {
            self.controls.dashboard.set_error(Some(e.to_string()));
        }
        result
    }

    fn refresh_gauges(&self) {
        Metrics::set_uptime(self.controls.dashboard.start_time());
        for kind in [DeviceKind::Plug, DeviceKind::Lamp] {
            Metrics::set_device_count(kind.as_str(), self.controls.registry.count(kind));
        }
    }
}

async fn index_handler(State(state): State<AppState>) -> Response {
    state.refresh_gauges();
    let summary = state.controls.dashboard.summary();
    let view = project(&state.controls.registry, &state.controls.selection);

    let templates = state.templates.read();
    let template = match templates.get_template("index.html") {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to get index template: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response();
        }
    };

    let html = match template.render(context! {
        title => "Smart Home Dashboard",
        view => view,
        uptime => summary.uptime_display(),
        sync_status => summary.sync_status.as_str(),
        last_error => summary.last_error,
    }) {
        Ok(html) => html,
        Err(e) => {
            error!("Failed to render index template: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Render error").into_response();
        }
    };

    Html(html).into_response()
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let summary = state.controls.dashboard.summary();
    let is_healthy = match summary.sync_status {
        SyncStatus::Idle => true,
        SyncStatus::Stopped => false,
        SyncStatus::Running => summary
            .last_tick_seconds_ago
            .map(|s| s < STALE_TICK_SECONDS)
            .unwrap_or(summary.uptime_seconds < STALE_TICK_SECONDS),
    };

    if is_healthy {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "UNHEALTHY").into_response()
    }
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    state.refresh_gauges();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics_handle.render(),
    )
        .into_response()
}

async fn api_status_handler(State(state): State<AppState>) -> Response {
    let summary = state.controls.dashboard.summary();
    let json = serde_json::json!({
        "status": "ok",
        "uptime_seconds": summary.uptime_seconds,
        "sync_status": summary.sync_status.as_str(),
        "devices": {
            "plugs": state.controls.registry.count(DeviceKind::Plug),
            "lamps": state.controls.registry.count(DeviceKind::Lamp),
        },
        "ticks": {
            "total": summary.tick_count,
            "last_seconds_ago": summary.last_tick_seconds_ago,
            "reads": summary.device_reads,
            "read_failures": summary.device_read_failures,
            "success_rate": summary.read_success_rate(),
        },
        "plug_host": summary.plug_host,
        "lamp_bridge": summary.lamp_bridge,
        "last_error": summary.last_error,
    });

    (StatusCode::OK, Json(json)).into_response()
}

async fn api_devices_handler(State(state): State<AppState>) -> Response {
    Json(project(&state.controls.registry, &state.controls.selection)).into_response()
}

async fn plug_toggle_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PlugView>> {
    let plug = state.remember(state.controls.plugs.toggle(&id).await)?;
    Ok(Json(PlugView::from(&plug)))
}

async fn lamp_power_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<LampView>> {
    let lamp = state.remember(state.controls.lamps.toggle_power(&id).await)?;
    Ok(Json(LampView::new(&lamp, state.controls.selection.target().as_deref())))
}

#[derive(Debug, Deserialize)]
struct BrightnessRequest {
    bri: u8,
}

async fn lamp_brightness_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<BrightnessRequest>,
) -> ApiResult<Json<LampView>> {
    let lamp = state.remember(state.controls.lamps.set_brightness(&id, request.bri).await)?;
    Ok(Json(LampView::new(&lamp, state.controls.selection.target().as_deref())))
}

async fn lamp_target_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.controls.selection.select(&state.controls.registry, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_target_handler(State(state): State<AppState>) -> StatusCode {
    state.controls.selection.clear();
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct PointerRequest {
    x: f64,
    y: f64,
    rect: WidgetRect,
}

#[derive(Debug, Serialize)]
struct SampleResponse {
    rgb: Rgb,
    hex: String,
}

async fn wheel_pointer_handler(
    State(state): State<AppState>,
    Json(request): Json<PointerRequest>,
) -> Response {
    let pointer = Pointer {
        x: request.x,
        y: request.y,
    };
    match state.controls.selection.track(pointer, request.rect) {
        Some(rgb) => Json(SampleResponse {
            hex: rgb.hex(),
            rgb,
        })
        .into_response(),
        None => (StatusCode::UNPROCESSABLE_ENTITY, "Empty wheel rectangle").into_response(),
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum ClickResponse {
    Applied { color: NativeColor },
    Deferred { color: NativeColor },
    Ignored,
}

async fn wheel_click_handler(State(state): State<AppState>) -> ApiResult<Json<ClickResponse>> {
    let outcome = state.remember(state.controls.selection.commit(&state.controls.lamps).await)?;
    Ok(Json(match outcome {
        Some(ColorOutcome::Applied(color)) => ClickResponse::Applied { color },
        Some(ColorOutcome::Deferred(color)) => ClickResponse::Deferred { color },
        None => ClickResponse::Ignored,
    }))
}
