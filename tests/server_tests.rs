// Tests for the HTTP surface, driven through the router without binding a socket

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use geo::Point;
use places_to_map::config::AppConfig;
use places_to_map::error::{ExportError, GeocodeError};
use places_to_map::export::Rasterizer;
use places_to_map::geocode::{AddressResolver, Geocoder};
use places_to_map::config::ServerConfig;
use places_to_map::server::{bind, router, AppState, SharedGeocoder, SharedRasterizer};
use places_to_map::session::Session;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const BOUNDARY: &str = "places-to-map-boundary";
const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0];

struct ParisGeocoder {
    calls: Arc<AtomicUsize>,
}

impl Geocoder for ParisGeocoder {
    fn geocode(&self, query: &str) -> Result<Option<Point<f64>>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if query.contains("Paris") {
            Ok(Some(Point::new(2.3522, 48.8566)))
        } else if query.contains("Lyon") {
            Ok(Some(Point::new(4.8357, 45.764)))
        } else {
            Ok(None)
        }
    }
}

#[derive(Default)]
struct RecordingRasterizer {
    transparent: Mutex<Vec<bool>>,
}

impl Rasterizer for RecordingRasterizer {
    fn rasterize(&self, html: &str, transparent: bool) -> Result<Vec<u8>, ExportError> {
        assert!(html.contains("leaflet"));
        self.transparent.lock().unwrap().push(transparent);
        Ok(FAKE_PNG.to_vec())
    }
}

struct Harness {
    state: Arc<AppState>,
    calls: Arc<AtomicUsize>,
    rasterizer: Arc<RecordingRasterizer>,
}

fn harness(with_browser: bool) -> Harness {
    let calls = Arc::new(AtomicUsize::new(0));
    let geocoder: SharedGeocoder = Box::new(ParisGeocoder { calls: calls.clone() });
    let rasterizer = Arc::new(RecordingRasterizer::default());
    let shared: Option<SharedRasterizer> = with_browser.then(|| rasterizer.clone() as SharedRasterizer);

    let state = AppState::new(
        AppConfig::default(),
        Session::new(AddressResolver::new(geocoder, "France")),
        shared,
    )
    .unwrap();

    Harness { state: Arc::new(state), calls, rasterizer }
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> Response {
        router(self.state.clone()).oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn upload(&self, csv: &str) -> Response {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"lieux.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{BOUNDARY}--\r\n"
        );
        let request = Request::post("/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn header_value(response: &Response, name: header::HeaderName) -> String {
    response.headers().get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

const CSV: &str = "nom;adresse;catégorie\n\
                   Café A;1 Rue de Paris;food\n\
                   Parc B;2 Rue de Lyon;leisure\n\
                   Perdu C;Nulle Part;food\n";

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_index_shows_upload_form() {
    let h = harness(true);
    let response = h.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("enctype=\"multipart/form-data\""));
}

#[tokio::test]
async fn test_map_without_upload_redirects_home() {
    let h = harness(true);
    let response = h.get("/map").await;
    assert!(response.status().is_redirection());
    assert_eq!(header_value(&response, header::LOCATION), "/");

    let response = h.get("/export/csv").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_geocodes_and_redirects() {
    let h = harness(true);
    let response = h.upload(CSV).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_value(&response, header::LOCATION), "/map");
    assert_eq!(h.calls.load(Ordering::SeqCst), 3);

    let page = body_text(h.get("/map").await).await;
    assert!(page.contains("2 lieux placés, 1 adresses non géocodées ignorées."));
    assert!(page.contains(r#"value="food" checked"#));
    assert!(page.contains(r#"value="leisure" checked"#));
    assert!(page.contains("data:text/html;base64,"));

    // Uploading the same file again hits the session cache only.
    h.upload(CSV).await;
    assert_eq!(h.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_upload_missing_columns_is_reported() {
    let h = harness(true);
    let response = h.upload("nom;ville\nA;Paris\n").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let page = body_text(response).await;
    assert!(page.contains("Le fichier CSV doit contenir les colonnes : adresse, catégorie"));
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Map and exports
// ============================================================================

#[tokio::test]
async fn test_map_view_follows_query() {
    let h = harness(true);
    h.upload(CSV).await;

    let html = body_text(h.get("/map/view?category=leisure&labels=on&font_size=16").await).await;
    assert!(html.contains("Parc B"));
    assert!(!html.contains("Café A"));
    assert!(html.contains("font-size: 16px"));
    assert!(html.contains(r#""style":"labelled""#));
}

#[tokio::test]
async fn test_export_html_is_an_attachment_with_title() {
    let h = harness(true);
    h.upload(CSV).await;

    let response = h.get("/export/html?title=Mes+lieux").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_DISPOSITION), "attachment; filename=\"carte.html\"");
    assert!(body_text(response).await.contains(r#"<div id="title">Mes lieux</div>"#));
}

#[tokio::test]
async fn test_export_csv_has_coordinates() {
    let h = harness(true);
    h.upload(CSV).await;

    let response = h.get("/export/csv").await;
    assert_eq!(header_value(&response, header::CONTENT_DISPOSITION), "attachment; filename=\"lat_long.csv\"");
    let csv = body_text(response).await;
    assert!(csv.starts_with("nom;adresse;catégorie;latitude;longitude\n"));
    assert!(csv.contains("Café A;1 Rue de Paris;food;48.8566;2.3522"));
    assert!(!csv.contains("Perdu C"));
}

#[tokio::test]
async fn test_export_png_background_depends_on_tiles() {
    let h = harness(true);
    h.upload(CSV).await;

    let response = h.get("/export/png?tile=osm").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "image/png");
    assert_eq!(header_value(&response, header::CONTENT_DISPOSITION), "attachment; filename=\"carte.png\"");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), FAKE_PNG);

    h.get("/export/png?tile=departements").await;
    assert_eq!(*h.rasterizer.transparent.lock().unwrap(), vec![true, false]);
}

#[tokio::test]
async fn test_export_png_without_browser_fails() {
    let h = harness(false);
    h.upload(CSV).await;

    let response = h.get("/export/png").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("No headless browser found"));
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn test_bind_accepts_host_names() {
    let config = ServerConfig { host: "localhost".to_string(), port: 0 };
    let listener = bind(&config).await.unwrap();
    assert!(listener.local_addr().unwrap().ip().is_loopback());
}
