use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Le fichier CSV doit contenir les colonnes : {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Geocoding error: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("No data loaded")]
    NoData,
}

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Unexpected response: {0}")]
    BadResponse(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No headless browser found ({0})")]
    BrowserNotFound(String),

    #[error("Failed to launch browser {binary}: {source}")]
    BrowserLaunch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Browser exited without a screenshot: {0}")]
    CaptureFailed(String),

    #[error("Browser did not finish within {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;
