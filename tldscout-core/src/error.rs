use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    #[error("Invalid registry directory: {0}")]
    InvalidDirectory(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("All registry services exhausted for {domain} (last error: {last_error})")]
    Exhausted { domain: String, last_error: String },

    #[error("Lookup cancelled for {0}")]
    Cancelled(String),
}

pub type Result<T> = std::result::Result<T, EnrichError>;

/// Outcome classification of a single registry request.
///
/// Variants are listed in classification priority order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("forbidden (HTTP 403)")]
    Forbidden,

    #[error("server error (HTTP {0})")]
    ServerError(u16),

    #[error("{0}")]
    Other(String),
}

impl LookupError {
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            429 => Some(LookupError::RateLimited),
            403 => Some(LookupError::Forbidden),
            s if s >= 500 => Some(LookupError::ServerError(s)),
            s if (200..300).contains(&s) => None,
            s => Some(LookupError::Other(format!("unexpected HTTP status {}", s))),
        }
    }
}
