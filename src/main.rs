use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use places_to_map::config::AppConfig;
use places_to_map::export::{ChromeRasterizer, Rasterizer, CSV_FILE_NAME, HTML_FILE_NAME, PNG_FILE_NAME};
use places_to_map::geocode::{AddressResolver, NominatimGeocoder};
use places_to_map::render::RenderTarget;
use places_to_map::server::{self, AppState, SharedGeocoder, SharedRasterizer};
use places_to_map::session::Session;
use places_to_map::view::{TileSource, ViewOptions, DEFAULT_FONT_SIZE, FONT_SIZES};
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode a CSV and write the map exports
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Semicolon-delimited CSV with nom, adresse and catégorie columns
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
        #[arg(short, long = "format", value_enum, default_values_t = [Format::Html])]
        formats: Vec<Format>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Serve the upload form and interactive map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Html,
    Png,
    Csv,
}

#[derive(clap::Args)]
struct ViewArgs {
    /// osm, positron or departements
    #[arg(long, default_value = "osm", value_parser = parse_tile)]
    tile: TileSource,
    /// Disable marker clustering
    #[arg(long)]
    force_points: bool,
    /// Show place names under the points
    #[arg(long)]
    labels: bool,
    #[arg(long, default_value_t = DEFAULT_FONT_SIZE, value_parser = parse_font_size)]
    font_size: u32,
    #[arg(long, default_value = "")]
    title: String,
    /// Only show these categories (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,
}

impl ViewArgs {
    fn into_options(self) -> ViewOptions {
        ViewOptions {
            tile: self.tile,
            force_points: self.force_points,
            labels: self.labels,
            font_size: self.font_size,
            fullscreen: false,
            title: self.title,
            categories: (!self.categories.is_empty()).then_some(self.categories),
        }
    }
}

fn parse_tile(s: &str) -> Result<TileSource, String> {
    TileSource::from_key(s).ok_or_else(|| format!("unknown tile source {:?}", s))
}

fn parse_font_size(s: &str) -> Result<u32, String> {
    s.parse().ok()
        .filter(|size| FONT_SIZES.contains(size))
        .ok_or_else(|| format!("font size must be one of {:?}", FONT_SIZES))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { config, input, out_dir, formats, view } => {
            println!("Rendering map with config: {:?}", config);
            let app_config = AppConfig::load_or_default(&config)?;
            let options = view.into_options();

            // The geocoder uses a blocking HTTP client, which must not live on the async runtime.
            tokio::task::spawn_blocking(move || render(app_config, input, out_dir, formats, options))
                .await??;

            println!("Rendering complete!");
        }
        Commands::Serve { config, port } => {
            println!("Serving map with config: {:?}", config);
            let mut app_config = AppConfig::load_or_default(&config)?;
            if let Some(port) = port {
                app_config.server.port = port;
            }

            let geocoding = app_config.geocoding.clone();
            let geocoder = tokio::task::spawn_blocking(move || NominatimGeocoder::new(&geocoding))
                .await??;
            let resolver = AddressResolver::new(
                Box::new(geocoder) as SharedGeocoder,
                app_config.geocoding.country.clone(),
            );

            let rasterizer = match ChromeRasterizer::from_config(&app_config.export) {
                Ok(r) => Some(Arc::new(r) as SharedRasterizer),
                Err(e) => {
                    warn!("PNG export disabled: {}", e);
                    None
                }
            };

            let state = AppState::new(app_config, Session::new(resolver), rasterizer)?;
            server::start_server(state).await?;
        }
    }

    Ok(())
}

fn render(
    config: AppConfig,
    input: PathBuf,
    out_dir: PathBuf,
    formats: Vec<Format>,
    options: ViewOptions,
) -> Result<()> {
    let delimiter = config.delimiter_byte()?;
    let geocoder = NominatimGeocoder::new(&config.geocoding)?;
    let mut session = Session::new(AddressResolver::new(geocoder, config.geocoding.country.clone()));

    // 1. Load, validate and geocode
    let file = File::open(&input).with_context(|| format!("Failed to open CSV file: {:?}", input))?;
    let placed = session.load(file, delimiter)?.len();
    println!("{} places located, {} dropped", placed, session.dropped());

    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;

    // 2. Exports
    for format in formats {
        match format {
            Format::Html => {
                let html = session.render(&options, &config.map, RenderTarget::Html)?;
                let path = out_dir.join(HTML_FILE_NAME);
                fs::write(&path, html).with_context(|| format!("Failed to write {:?}", path))?;
                println!("Wrote {:?}", path);
            }
            Format::Png => {
                let html = session.render(&options, &config.map, RenderTarget::Png)?;
                let rasterizer = ChromeRasterizer::from_config(&config.export)?;
                let png = rasterizer.rasterize(&html, !options.tile.kept_in_png())
                    .map_err(|e| anyhow!("PNG export with {:?} failed: {}", rasterizer.binary(), e))?;
                let path = out_dir.join(PNG_FILE_NAME);
                fs::write(&path, png).with_context(|| format!("Failed to write {:?}", path))?;
                println!("Wrote {:?}", path);
            }
            Format::Csv => {
                let csv = session.resolved_csv(delimiter)?;
                let path = out_dir.join(CSV_FILE_NAME);
                fs::write(&path, csv).with_context(|| format!("Failed to write {:?}", path))?;
                println!("Wrote {:?}", path);
            }
        }
    }

    Ok(())
}
