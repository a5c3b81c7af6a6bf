use crate::config::MapConfig;
use crate::html::{escape, fill_template, map::MAP_HTML};
use crate::processing::{assign_colors, distinct_categories, filter_by_categories, Color, ColorMap};
use crate::types::Place;
use crate::view::{TileLayer, ViewOptions};
use geo::{BoundingRect, MultiPoint, Point, Rect};
use serde::Serialize;
use tracing::debug;

// Fitting a single point would otherwise zoom all the way in.
const FIT_MAX_ZOOM: u8 = 15;
const DOT_RADIUS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// Live map embedded in the web UI.
    Interactive,
    /// Downloadable `carte.html`.
    Html,
    /// Document handed to the headless browser.
    Png,
}

impl RenderTarget {
    fn is_export(self) -> bool {
        self != RenderTarget::Interactive
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extent {
    Bounds(Rect<f64>),
    Default { center: [f64; 2], zoom: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStyle {
    Dot,
    Labelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub color: &'static str,
    pub style: MarkerStyle,
}

/// Everything needed to write the map document, decided up front so the HTML
/// step has no logic of its own.
pub struct MapView {
    pub tile: Option<TileLayer>,
    pub extent: Extent,
    pub markers: Vec<Marker>,
    pub legend: ColorMap,
    pub clustered: bool,
    pub font_size: u32,
    pub title: Option<String>,
    pub fullscreen: bool,
    pub target: RenderTarget,
}

pub fn compose(places: &[Place], options: &ViewOptions, config: &MapConfig, target: RenderTarget) -> MapView {
    let filtered: Vec<&Place> = filter_by_categories(places, options.categories.as_deref())
        .into_iter()
        .filter(|p| p.location.is_some())
        .collect();

    let legend = assign_colors(&distinct_categories(filtered.iter().copied()));
    let style = if options.labels { MarkerStyle::Labelled } else { MarkerStyle::Dot };

    let markers: Vec<Marker> = filtered.iter()
        .filter_map(|p| {
            let location = p.location?;
            let color = legend.get(&p.category).unwrap_or(FALLBACK_COLOR);
            Some(Marker {
                lat: location.y(),
                lon: location.x(),
                name: p.name.clone(),
                color: color.hex,
                style,
            })
        })
        .collect();

    let extent = compute_extent(filtered.iter().filter_map(|p| p.location), config);

    let tile = if target == RenderTarget::Png && !options.tile.kept_in_png() {
        None
    } else {
        Some(options.tile.layer(config))
    };

    let title = Some(options.title.trim())
        .filter(|t| target.is_export() && !t.is_empty())
        .map(str::to_string);

    debug!("Composed {} markers in {} categories for {:?}", markers.len(), legend.len(), target);

    MapView {
        tile,
        extent,
        markers,
        legend,
        clustered: options.clustered(),
        font_size: options.font_size,
        title,
        fullscreen: options.fullscreen && target == RenderTarget::Interactive,
        target,
    }
}

const FALLBACK_COLOR: Color = crate::processing::PALETTE[1];

/// Element-wise min/max of the points, or the configured default view when there are none.
pub fn compute_extent<I>(points: I, config: &MapConfig) -> Extent
where
    I: IntoIterator<Item = Point<f64>>,
{
    let points: MultiPoint<f64> = points.into_iter().collect();
    match points.bounding_rect() {
        Some(rect) => Extent::Bounds(rect),
        None => Extent::Default {
            center: config.default_center,
            zoom: config.default_zoom,
        },
    }
}

pub fn generate_legend_html(legend: &ColorMap) -> String {
    let mut html = String::from(
        r#"<div id="legend"><h4>Légende</h4><ul>"#,
    );
    for (category, color) in legend.iter() {
        html.push_str(&format!(
            r#"<li><span class="swatch" style="background-color: {};"></span>{}</li>"#,
            color.hex,
            escape(category),
        ));
    }
    html.push_str("</ul></div>");
    html
}

fn extent_js(extent: &Extent) -> String {
    match extent {
        Extent::Bounds(rect) => format!(
            "map.fitBounds([[{}, {}], [{}, {}]], {{ padding: [20, 20], maxZoom: {} }});",
            rect.min().y, rect.min().x, rect.max().y, rect.max().x, FIT_MAX_ZOOM,
        ),
        Extent::Default { center, zoom } => {
            format!("map.setView([{}, {}], {});", center[0], center[1], zoom)
        }
    }
}

fn json_for_script<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

/// Serialise the view into a self-contained document.
pub fn render_html(view: &MapView) -> String {
    let tile_js = match &view.tile {
        Some(layer) => format!(
            "L.tileLayer({}, {{ attribution: {}, maxZoom: 19 }}).addTo(map);",
            json_for_script(&layer.url),
            json_for_script(&layer.attribution),
        ),
        None => String::new(),
    };

    let title_html = view.title.as_deref()
        .map(|t| format!(r#"<div id="title">{}</div>"#, escape(t)))
        .unwrap_or_default();

    let (fullscreen_head, fullscreen_js) = if view.fullscreen {
        (
            concat!(
                r#"<link rel="stylesheet" href="https://unpkg.com/leaflet.fullscreen@3.0.2/Control.FullScreen.css" />"#,
                r#"<script src="https://unpkg.com/leaflet.fullscreen@3.0.2/Control.FullScreen.js"></script>"#,
            ),
            "L.control.fullscreen({ position: 'topleft' }).addTo(map);",
        )
    } else {
        ("", "")
    };

    let background = if view.tile.is_none() { "transparent" } else { "#ddd" };

    let font_size = view.font_size.to_string();
    let dot_radius = DOT_RADIUS.to_string();
    let legend = generate_legend_html(&view.legend);
    let extent = extent_js(&view.extent);
    let markers = json_for_script(&view.markers);

    fill_template(MAP_HTML, &[
        ("FULLSCREEN_HEAD", fullscreen_head),
        ("BACKGROUND", background),
        ("FONT_SIZE", font_size.as_str()),
        ("DOT_RADIUS", dot_radius.as_str()),
        ("TITLE", title_html.as_str()),
        ("LEGEND", legend.as_str()),
        ("TILE_LAYER", tile_js.as_str()),
        ("FULLSCREEN_CONTROL", fullscreen_js),
        ("EXTENT", extent.as_str()),
        ("CLUSTERED", if view.clustered { "true" } else { "false" }),
        ("MARKERS", markers.as_str()),
    ])
}
