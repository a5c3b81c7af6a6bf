use crate::config::{AppConfig, ServerConfig};
use crate::error::{ExportError, MapError};
use crate::export::{html_data_uri, Rasterizer, CSV_FILE_NAME, HTML_FILE_NAME, PNG_FILE_NAME};
use crate::geocode::Geocoder;
use crate::html::pages::{map_page, upload_page, MapPage};
use crate::render::RenderTarget;
use crate::session::Session;
use crate::view::ViewOptions;
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, RawQuery, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub type SharedGeocoder = Box<dyn Geocoder + Send>;
pub type SharedRasterizer = Arc<dyn Rasterizer + Send + Sync>;

pub struct AppState {
    pub config: AppConfig,
    delimiter: u8,
    session: Mutex<Session<SharedGeocoder>>,
    rasterizer: Option<SharedRasterizer>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        session: Session<SharedGeocoder>,
        rasterizer: Option<SharedRasterizer>,
    ) -> Result<Self> {
        Ok(Self {
            delimiter: config.delimiter_byte()?,
            config,
            session: Mutex::new(session),
            rasterizer,
        })
    }
}

pub struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

impl From<MapError> for AppError {
    fn from(err: MapError) -> Self {
        let status = match &err {
            MapError::MissingColumns(_) | MapError::Csv(_) => StatusCode::BAD_REQUEST,
            MapError::NoData => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("{}", err);
        }
        AppError(status, err.to_string())
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        MapError::Export(err).into()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("Blocking task failed: {}", err);
        AppError(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/upload", post(upload_handler))
        .route("/map", get(map_handler))
        .route("/map/view", get(map_view_handler))
        .route("/export/html", get(export_html_handler))
        .route("/export/png", get(export_png_handler))
        .route("/export/csv", get(export_csv_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(state: AppState) -> Result<()> {
    let listener = bind(&state.config.server).await?;
    let app = router(Arc::new(state));

    info!("Starting server on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Accepts host names as well as IP literals.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))
}

async fn index_handler() -> Html<String> {
    Html(upload_page(None))
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await
        .map_err(|e| AppError(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field.bytes().await
                .map_err(|e| AppError(StatusCode::BAD_REQUEST, e.to_string()))?;
            upload = Some(bytes);
            break;
        }
    }

    let Some(bytes) = upload else {
        return Ok((StatusCode::BAD_REQUEST, Html(upload_page(Some("Aucun fichier reçu")))).into_response());
    };

    info!("Received upload of {} bytes", bytes.len());
    let task_state = state.clone();
    let loaded = tokio::task::spawn_blocking(move || {
        let mut session = task_state.session.blocking_lock();
        let loaded = session.load(bytes.as_ref(), task_state.delimiter).map(|_| ());
        drop(session);
        loaded
    })
    .await?;

    match loaded {
        Ok(()) => Ok(Redirect::to("/map").into_response()),
        Err(err @ (MapError::MissingColumns(_) | MapError::Csv(_))) => {
            warn!("Rejected upload: {}", err);
            Ok((StatusCode::BAD_REQUEST, Html(upload_page(Some(&err.to_string())))).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

async fn map_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let options = ViewOptions::from_query(query.as_deref().unwrap_or(""));
    let session = state.session.lock().await;

    let table = match session.table() {
        Ok(table) => table,
        Err(MapError::NoData) => return Ok(Redirect::to("/").into_response()),
        Err(err) => return Err(err.into()),
    };

    let categories = session.categories()?;
    let export = session.render(&options, &state.config.map, RenderTarget::Html)?;
    let html_download = html_data_uri(&export);

    Ok(Html(map_page(&MapPage {
        options: &options,
        categories: &categories,
        rows: table.len(),
        dropped: session.dropped(),
        html_download: &html_download,
    }))
    .into_response())
}

async fn map_view_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Html<String>, AppError> {
    let options = ViewOptions::from_query(query.as_deref().unwrap_or(""));
    let session = state.session.lock().await;
    Ok(Html(session.render(&options, &state.config.map, RenderTarget::Interactive)?))
}

async fn export_html_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let options = ViewOptions::from_query(query.as_deref().unwrap_or(""));
    let html = state.session.lock().await
        .render(&options, &state.config.map, RenderTarget::Html)?;
    Ok(attachment("text/html; charset=utf-8", HTML_FILE_NAME, html.into_bytes()))
}

async fn export_png_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let options = ViewOptions::from_query(query.as_deref().unwrap_or(""));
    let html = state.session.lock().await
        .render(&options, &state.config.map, RenderTarget::Png)?;

    let rasterizer = state.rasterizer.clone()
        .ok_or_else(|| ExportError::BrowserNotFound("PNG export is disabled".to_string()))?;
    let transparent = !options.tile.kept_in_png();

    info!("Generating PNG image of the map...");
    let png = tokio::task::spawn_blocking(move || rasterizer.rasterize(&html, transparent)).await??;
    Ok(attachment("image/png", PNG_FILE_NAME, png))
}

async fn export_csv_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let csv = state.session.lock().await.resolved_csv(state.delimiter)?;
    Ok(attachment("text/csv; charset=utf-8", CSV_FILE_NAME, csv))
}

fn attachment(content_type: &'static str, file_name: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        body,
    )
        .into_response()
}
