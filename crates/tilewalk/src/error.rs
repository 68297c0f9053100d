//! Error types for the tilewalk crate.

use std::fmt;

use tilewalk_geo::GeoError;

/// Result type for tilewalk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning or fetching tiles.
#[derive(Debug)]
pub enum Error {
    /// The caller supplied an unusable configuration.
    Config {
        /// What was being configured.
        context: &'static str,
        /// Description of the problem.
        detail: String,
    },
    /// Invalid geometry input.
    Geo(GeoError),
    /// HTTP request failed.
    Http {
        /// The URL that failed.
        url: String,
        /// The error message.
        message: String,
    },
    /// HTTP response had a non-success status code.
    HttpStatus {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// A tileset document could not be parsed.
    Json {
        /// The document URL.
        url: String,
        /// The parser message.
        message: String,
    },
    /// Binary content was expected but the payload is JSON.
    ///
    /// Usually a misrouted URI or a missing session token.
    UnexpectedJson {
        /// The content URL.
        url: String,
    },
    /// Binary content failed validation.
    InvalidContent {
        /// The content URL.
        url: String,
        /// Description of what was invalid.
        detail: String,
    },
    /// Cache operation failed.
    Cache {
        /// The operation that failed.
        operation: &'static str,
        /// The error message.
        message: String,
    },
    /// No tile could be obtained and the byte cap was not the reason.
    Acquisition {
        /// The first content URI that failed.
        uri: String,
        /// Why it failed.
        cause: String,
    },
    /// The operation was cancelled before it produced anything.
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config { context, detail } => write!(f, "invalid {context}: {detail}"),
            Error::Geo(e) => write!(f, "geometry error: {e}"),
            Error::Http { url, message } => {
                write!(f, "http request to {url} failed: {message}")
            }
            Error::HttpStatus { url, status } => {
                write!(f, "http request to {url} returned status {status}")
            }
            Error::Json { url, message } => {
                write!(f, "failed to parse tileset {url}: {message}")
            }
            Error::UnexpectedJson { url } => {
                write!(f, "expected binary tile content from {url}, got JSON")
            }
            Error::InvalidContent { url, detail } => {
                write!(f, "invalid tile content from {url}: {detail}")
            }
            Error::Cache { operation, message } => {
                write!(f, "cache {operation} failed: {message}")
            }
            Error::Acquisition { uri, cause } => {
                write!(f, "no tiles could be acquired; first failure was {uri}: {cause}")
            }
            Error::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Geo(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeoError> for Error {
    fn from(e: GeoError) -> Self {
        Error::Geo(e)
    }
}

impl Error {
    pub(crate) fn cache(operation: &'static str, e: impl fmt::Display) -> Self {
        Error::Cache {
            operation,
            message: e.to_string(),
        }
    }
}
