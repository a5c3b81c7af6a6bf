use crate::config::MapConfig;
use url::form_urlencoded;

pub const FONT_SIZES: [u32; 7] = [8, 10, 12, 14, 16, 18, 20];
pub const DEFAULT_FONT_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileSource {
    #[default]
    OpenStreetMap,
    CartoDbPositron,
    FranceDepartements,
}

pub struct TileLayer {
    pub url: String,
    pub attribution: String,
}

impl TileSource {
    pub const ALL: [TileSource; 3] = [
        TileSource::OpenStreetMap,
        TileSource::CartoDbPositron,
        TileSource::FranceDepartements,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TileSource::OpenStreetMap => "osm",
            TileSource::CartoDbPositron => "positron",
            TileSource::FranceDepartements => "departements",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TileSource::OpenStreetMap => "OpenStreetMap",
            TileSource::CartoDbPositron => "CartoDB positron",
            TileSource::FranceDepartements => "France départements",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter()
            .find(|t| t.key().eq_ignore_ascii_case(key) || t.label().eq_ignore_ascii_case(key))
    }

    pub fn layer(self, config: &MapConfig) -> TileLayer {
        match self {
            TileSource::OpenStreetMap => TileLayer {
                url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                attribution: "&copy; OpenStreetMap contributors".to_string(),
            },
            TileSource::CartoDbPositron => TileLayer {
                url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png".to_string(),
                attribution: "&copy; OpenStreetMap contributors &copy; CARTO".to_string(),
            },
            TileSource::FranceDepartements => TileLayer {
                url: config.departements_tiles.clone(),
                attribution: config.departements_attribution.clone(),
            },
        }
    }

    /// Only the custom departements layer is kept when rasterising; the others
    /// are dropped to leave a transparent background.
    pub fn kept_in_png(self) -> bool {
        self == TileSource::FranceDepartements
    }
}

/// Every option a user can toggle for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub tile: TileSource,
    /// Disables clustering.
    pub force_points: bool,
    pub labels: bool,
    pub font_size: u32,
    pub fullscreen: bool,
    pub title: String,
    /// `None` shows every category.
    pub categories: Option<Vec<String>>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            tile: TileSource::default(),
            force_points: false,
            labels: false,
            font_size: DEFAULT_FONT_SIZE,
            fullscreen: false,
            title: String::new(),
            categories: None,
        }
    }
}

impl ViewOptions {
    pub fn clustered(&self) -> bool {
        !self.force_points
    }

    /// Parse a urlencoded query. Unknown keys are ignored and values outside the
    /// fixed option lists fall back to their defaults.
    pub fn from_query(query: &str) -> Self {
        let mut options = Self::default();
        let mut categories = Vec::new();
        let mut filtered = false;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "tile" => options.tile = TileSource::from_key(&value).unwrap_or_default(),
                "force_points" => options.force_points = is_checked(&value),
                "labels" => options.labels = is_checked(&value),
                "fullscreen" => options.fullscreen = is_checked(&value),
                "font_size" => {
                    options.font_size = value.parse().ok()
                        .filter(|size| FONT_SIZES.contains(size))
                        .unwrap_or(DEFAULT_FONT_SIZE);
                }
                "title" => options.title = value.trim().to_string(),
                "category" => {
                    filtered = true;
                    categories.push(value.into_owned());
                }
                // Sent by the form so that unticking every category means "none".
                "filtered" => filtered = true,
                _ => {}
            }
        }

        if filtered {
            options.categories = Some(categories);
        }
        options
    }

    pub fn to_query(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        ser.append_pair("tile", self.tile.key());
        if self.force_points {
            ser.append_pair("force_points", "on");
        }
        if self.labels {
            ser.append_pair("labels", "on");
        }
        if self.fullscreen {
            ser.append_pair("fullscreen", "on");
        }
        ser.append_pair("font_size", &self.font_size.to_string());
        if !self.title.is_empty() {
            ser.append_pair("title", &self.title);
        }
        if let Some(categories) = &self.categories {
            ser.append_pair("filtered", "1");
            for c in categories {
                ser.append_pair("category", c);
            }
        }
        ser.finish()
    }

    pub fn is_selected(&self, category: &str) -> bool {
        self.categories.as_ref().map_or(true, |c| c.iter().any(|s| s == category))
    }
}

fn is_checked(value: &str) -> bool {
    matches!(value, "on" | "true" | "1")
}
