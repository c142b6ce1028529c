use std::time::Duration;
use thiserror::Error;

/// Main error type for the wicket proxy
#[derive(Error, Debug, Clone)]
pub enum WicketError {
    /// Configuration related errors (fatal at startup)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream dial errors (surfaced to the client as 503)
    #[error("dial {target}: {message}")]
    Dial { target: String, message: String },

    /// The inbound connection cannot be taken over for tunneling
    #[error("connection hijacking not supported: {message}")]
    HijackUnsupported { message: String },

    /// A cached response could not be serialized or parsed back
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// The persisted block-list store could not be read or written
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// An `Expires` header value could not be parsed as an HTTP date
    #[error("unparsable date {value:?}: {message}")]
    DateParse { value: String, message: String },

    /// Upstream HTTP transport errors
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// IO related errors
    #[error("IO error: {message}")]
    Io { message: String },

    /// Timeout errors
    #[error("Operation timed out after {duration:?}: {operation}")]
    Timeout {
        duration: Duration,
        operation: String,
    },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl WicketError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a dial error
    pub fn dial<T: Into<String>, S: Into<String>>(target: T, message: S) -> Self {
        Self::Dial {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a hijack-unsupported error
    pub fn hijack_unsupported<S: Into<String>>(message: S) -> Self {
        Self::HijackUnsupported {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a date parse error
    pub fn date_parse<V: Into<String>, S: Into<String>>(value: V, message: S) -> Self {
        Self::DateParse {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP transport error
    pub fn http<S: Into<String>>(message: S) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(duration: Duration, operation: S) -> Self {
        Self::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error is fatal to the process. Only configuration
    /// errors at startup refuse to start; everything else is recovered
    /// locally with a logged diagnostic.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WicketError::Config { .. })
    }
}

/// Result type alias for wicket operations
pub type WicketResult<T> = Result<T, WicketError>;

/// Convert from std::io::Error to WicketError
impl From<std::io::Error> for WicketError {
    fn from(err: std::io::Error) -> Self {
        WicketError::io(err.to_string())
    }
}

/// Convert from hyper::Error to WicketError
impl From<hyper::Error> for WicketError {
    fn from(err: hyper::Error) -> Self {
        WicketError::http(err.to_string())
    }
}

/// Convert from hyper::http::Error to WicketError
impl From<hyper::http::Error> for WicketError {
    fn from(err: hyper::http::Error) -> Self {
        WicketError::http(err.to_string())
    }
}

/// Convert from toml::de::Error to WicketError
impl From<toml::de::Error> for WicketError {
    fn from(err: toml::de::Error) -> Self {
        WicketError::config(format!("TOML parsing error: {}", err))
    }
}

/// Convert from serde_json::Error to WicketError
impl From<serde_json::Error> for WicketError {
    fn from(err: serde_json::Error) -> Self {
        WicketError::internal(format!("JSON serialization error: {}", err))
    }
}
