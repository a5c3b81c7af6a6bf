use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub geocoding: GeocodingConfig,
    pub map: MapConfig,
    pub export: ExportConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { delimiter: ';' }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocodingConfig {
    pub endpoint: String,
    pub user_agent: String,
    /// Appended to every query as `"<address>, <country>"`.
    pub country: String,
    pub timeout_secs: u64,
    /// Minimum delay between two requests to the endpoint.
    pub min_interval_ms: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
            user_agent: concat!("places-to-map/", env!("CARGO_PKG_VERSION")).to_string(),
            country: "France".to_string(),
            timeout_secs: 10,
            min_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    /// [lat, lon] used when there is nothing to fit.
    pub default_center: [f64; 2],
    pub default_zoom: u8,
    pub departements_tiles: String,
    pub departements_attribution: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: [46.5, 2.5],
            default_zoom: 6,
            departements_tiles: "https://lduf.github.io/places_to_map/tiles/{z}/{x}/{y}.png".to_string(),
            departements_attribution: "France départements".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    /// Explicit browser binary. Looked up on PATH when unset.
    pub browser: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub virtual_time_budget_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            browser: None,
            width: 2400,
            height: 1600,
            virtual_time_budget_ms: 5000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Like `load_from_file`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            info!("No config file at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        let c = self.input.delimiter;
        u8::try_from(c).ok().filter(u8::is_ascii)
            .with_context(|| format!("Delimiter must be a single ASCII character, got {:?}", c))
    }
}
