//! Error types for the connector module.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by request and browser connectors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The connector variant does not implement this operation.
    #[error("{connector} connector does not support {operation}")]
    UnsupportedOperation {
        /// Operation name, e.g. `post`.
        operation: &'static str,
        /// Connector kind, e.g. `browser`.
        connector: &'static str,
    },

    /// A wait condition was not satisfied before its timeout.
    #[error("timed out after {timeout:?} waiting for {locator}")]
    WaitTimeout {
        /// The awaited locator, rendered.
        locator: String,
        /// The configured timeout.
        timeout: Duration,
    },

    /// The browser session was already released.
    #[error("browser session is disconnected")]
    Disconnected,

    /// A locator strategy name is not recognized.
    #[error("unknown locator strategy '{name}'")]
    UnknownLocatorStrategy {
        /// The rejected name.
        name: String,
    },

    /// A wait method name is not recognized.
    #[error("unsupported wait method '{name}' (expected presence_of_element_located)")]
    UnsupportedWaitMethod {
        /// The rejected name.
        name: String,
    },

    /// The URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },

    /// The request did not complete.
    #[error("request to {url} failed: {source}")]
    Network {
        /// The requested URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request timed out.
    #[error("request to {url} timed out")]
    Timeout {
        /// The requested URL.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The browser driver reported a failure.
    #[error("browser driver error: {message}")]
    Driver {
        /// Driver-provided description.
        message: String,
    },

    /// The cookie store refused a cookie, e.g. its domain does not match the URL.
    #[error("cookie rejected for {url}: {source}")]
    CookieRejected {
        /// The URL the cookie was set for.
        url: String,
        /// The store's reason.
        #[source]
        source: cookie_store::CookieError,
    },

    /// Writing saved content failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ConnectorError {
    /// Creates an unsupported-operation error.
    #[must_use]
    pub fn unsupported(operation: &'static str, connector: &'static str) -> Self {
        Self::UnsupportedOperation {
            operation,
            connector,
        }
    }

    /// Creates a network error, distinguishing timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates a driver error from any displayable failure.
    pub fn driver(message: impl std::fmt::Display) -> Self {
        Self::Driver {
            message: message.to_string(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_display() {
        let msg = ConnectorError::unsupported("post", "browser").to_string();
        assert_eq!(msg, "browser connector does not support post");
    }

    #[test]
    fn test_wait_timeout_display() {
        let msg = ConnectorError::WaitTimeout {
            locator: "ID=gallery".to_string(),
            timeout: Duration::from_secs(10),
        }
        .to_string();
        assert!(msg.contains("10s"));
        assert!(msg.contains("ID=gallery"));
    }
}
