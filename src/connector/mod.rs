//! Pluggable fetch mechanisms for pages behind cookies or JavaScript.
//!
//! [`Connector`] is a closed set of two variants:
//!
//! - [`RequestConnector`] - plain HTTP with a persistent cookie jar, extra
//!   headers and a pause after every response
//! - [`BrowserConnector`] - a scripted browser session that can wait for an
//!   element before reading the rendered page
//!
//! The Chromium-backed [`BrowserDriver`] lives behind the `chromium` cargo
//! feature. Other drivers plug in through the trait.
//!
//! # Example
//!
//! ```no_run
//! use webarchiver::connector::{Connector, RequestConnector, RequestConnectorConfig};
//! use reqwest::header::HeaderMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RequestConnectorConfig::new("cookies.txt");
//! let mut connector = Connector::from(RequestConnector::new(config)?);
//! let html = connector
//!     .get("https://example.com/gallery", &[("page", "2")], HeaderMap::new())
//!     .await?;
//! println!("{} bytes", html.len());
//! connector.disconnect().await?;
//! # Ok(())
//! # }
//! ```

mod browser;
#[cfg(feature = "chromium")]
mod chromium;
mod error;
mod query;
mod request;

use std::path::Path;

use reqwest::header::HeaderMap;

pub use browser::{
    BrowserConnector, BrowserDriver, DEFAULT_POLL_INTERVAL, Locator, LocatorQuery, LocatorStrategy,
    PRESENCE_OF_ELEMENT_LOCATED, WaitCondition,
};
#[cfg(feature = "chromium")]
pub use chromium::{ChromiumDriver, ChromiumOptions};
pub use error::ConnectorError;
pub use query::create_get_url;
pub use request::{DEFAULT_REQUEST_DELAY, RequestConnector, RequestConnectorConfig};

/// A fetch mechanism.
#[derive(Debug)]
pub enum Connector {
    Request(RequestConnector),
    Browser(BrowserConnector),
}

impl Connector {
    /// Short label for logs: `request` or `browser`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Browser(_) => "browser",
        }
    }

    /// Fetches `url` with `params` merged into its query string.
    ///
    /// The browser variant ignores `headers`.
    ///
    /// # Errors
    ///
    /// See [`RequestConnector::get`] and [`BrowserConnector::get`].
    pub async fn get<K, V>(
        &mut self,
        url: &str,
        params: &[(K, V)],
        headers: HeaderMap,
    ) -> Result<String, ConnectorError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match self {
            Self::Request(connector) => connector.get(url, params, headers).await,
            Self::Browser(connector) => connector.get(&create_get_url(url, params)).await,
        }
    }

    /// Submits a form.
    ///
    /// # Errors
    ///
    /// The browser variant always returns [`ConnectorError::UnsupportedOperation`].
    pub async fn post<K, V>(
        &mut self,
        url: &str,
        form: &[(K, V)],
        headers: HeaderMap,
    ) -> Result<String, ConnectorError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match self {
            Self::Request(connector) => connector.post(url, form, headers).await,
            Self::Browser(connector) => connector.post(url),
        }
    }

    /// Releases any session. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the browser driver's close failure.
    pub async fn disconnect(&mut self) -> Result<(), ConnectorError> {
        match self {
            Self::Request(connector) => {
                connector.disconnect();
                Ok(())
            }
            Self::Browser(connector) => connector.disconnect().await,
        }
    }

    /// Content of the most recent successful fetch.
    #[must_use]
    pub fn last_content(&self) -> &str {
        match self {
            Self::Request(connector) => connector.last_content(),
            Self::Browser(connector) => connector.last_content(),
        }
    }

    /// Writes the most recent content to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Io`] if the file cannot be written.
    pub async fn save_last_content(&mut self, path: &Path) -> Result<(), ConnectorError> {
        match self {
            Self::Request(connector) => connector.save_last_content(path).await,
            Self::Browser(connector) => connector.save_last_content(path).await,
        }
    }
}

impl From<RequestConnector> for Connector {
    fn from(connector: RequestConnector) -> Self {
        Self::Request(connector)
    }
}

impl From<BrowserConnector> for Connector {
    fn from(connector: BrowserConnector) -> Self {
        Self::Browser(connector)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::browser::tests::FakeDriver;
    use super::*;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_browser_variant_merges_params_into_url() {
        let driver = FakeDriver::default();
        let mut connector = Connector::from(BrowserConnector::new(Box::new(driver.clone())));

        connector
            .get("https://example.com/list", &[("page", "3")], HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(connector.kind(), "browser");
        assert_eq!(
            driver.visited.lock().unwrap().as_slice(),
            ["https://example.com/list?page=3"]
        );
    }

    #[tokio::test]
    async fn test_browser_variant_rejects_post() {
        let mut connector =
            Connector::from(BrowserConnector::new(Box::new(FakeDriver::default())));
        let result = connector
            .post("https://example.com/", &[("a", "b")], HeaderMap::new())
            .await;
        assert!(matches!(
            result,
            Err(ConnectorError::UnsupportedOperation { .. })
        ));
    }

    #[tokio::test]
    async fn test_disconnect_twice_closes_once() {
        let driver = FakeDriver::default();
        let mut connector = Connector::from(BrowserConnector::new(Box::new(driver.clone())));

        connector.disconnect().await.unwrap();
        connector.disconnect().await.unwrap();

        assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_variant_disconnect_is_noop() {
        let temp = TempDir::new().unwrap();
        let config = RequestConnectorConfig::new(temp.path().join("cookies.txt"));
        let mut connector = Connector::from(RequestConnector::new(config).unwrap());

        connector.disconnect().await.unwrap();
        connector.disconnect().await.unwrap();

        assert_eq!(connector.kind(), "request");
        assert_eq!(connector.last_content(), "");
    }
}
