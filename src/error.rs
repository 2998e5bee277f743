use thiserror::Error;

/// Failure reported by an external collaborator (catalog API, web search
/// session, completion model, channel guide).
///
/// The resolution chain never propagates these; it logs them and falls back
/// to empty values.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("unexpected response shape: {0}")]
    Parse(String),

    #[error("source not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout(e.to_string())
        } else if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Unavailable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}

impl From<anyhow::Error> for SourceError {
    fn from(e: anyhow::Error) -> Self {
        SourceError::Unavailable(format!("{:#}", e))
    }
}

/// Failure while reading or writing the durable tables.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no program data was collected from any channel; refusing to write an empty table")]
    NoCollectedData,

    #[error("I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl CatalogError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn csv(path: &std::path::Path, source: csv::Error) -> Self {
        CatalogError::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
