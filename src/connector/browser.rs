//! Scripted-browser connector for JavaScript-rendered pages.
//!
//! The connector drives one browser session through the [`BrowserDriver`]
//! trait. After navigating it can poll for an element described by a
//! [`WaitCondition`] before reading the rendered page source.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::error::ConnectorError;

/// Interval between element presence checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// The only wait method understood by [`WaitCondition::from_parts`].
pub const PRESENCE_OF_ELEMENT_LOCATED: &str = "presence_of_element_located";

/// How an element is located on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorStrategy {
    Id,
    Name,
    ClassName,
    TagName,
    CssSelector,
    XPath,
    LinkText,
    PartialLinkText,
}

impl LocatorStrategy {
    /// Upper-case name, e.g. `CSS_SELECTOR`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Name => "NAME",
            Self::ClassName => "CLASS_NAME",
            Self::TagName => "TAG_NAME",
            Self::CssSelector => "CSS_SELECTOR",
            Self::XPath => "XPATH",
            Self::LinkText => "LINK_TEXT",
            Self::PartialLinkText => "PARTIAL_LINK_TEXT",
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocatorStrategy {
    type Err = ConnectorError;

    /// Accepts both constant names (`CSS_SELECTOR`) and wire names
    /// (`css selector`), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "ID" => Ok(Self::Id),
            "NAME" => Ok(Self::Name),
            "CLASS_NAME" => Ok(Self::ClassName),
            "TAG_NAME" => Ok(Self::TagName),
            "CSS_SELECTOR" | "CSS" => Ok(Self::CssSelector),
            "XPATH" => Ok(Self::XPath),
            "LINK_TEXT" => Ok(Self::LinkText),
            "PARTIAL_LINK_TEXT" => Ok(Self::PartialLinkText),
            _ => Err(ConnectorError::UnknownLocatorStrategy {
                name: s.to_string(),
            }),
        }
    }
}

/// A query a driver can run: CSS selector or XPath expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorQuery {
    Css(String),
    XPath(String),
}

/// An element locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

impl Locator {
    #[must_use]
    pub fn new(strategy: LocatorStrategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Id, value)
    }

    #[must_use]
    pub fn css(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::CssSelector, value)
    }

    #[must_use]
    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::XPath, value)
    }

    /// Translates the locator into a CSS or XPath query.
    #[must_use]
    pub fn to_query(&self) -> LocatorQuery {
        let value = &self.value;
        match self.strategy {
            LocatorStrategy::Id => LocatorQuery::Css(format!("[id={}]", css_string(value))),
            LocatorStrategy::Name => LocatorQuery::Css(format!("[name={}]", css_string(value))),
            LocatorStrategy::ClassName => LocatorQuery::Css(format!(
                "[class~={}]",
                css_string(value)
            )),
            LocatorStrategy::TagName | LocatorStrategy::CssSelector => {
                LocatorQuery::Css(value.clone())
            }
            LocatorStrategy::XPath => LocatorQuery::XPath(value.clone()),
            LocatorStrategy::LinkText => LocatorQuery::XPath(format!(
                "//a[normalize-space(.)={}]",
                xpath_string(value)
            )),
            LocatorStrategy::PartialLinkText => {
                LocatorQuery::XPath(format!("//a[contains(., {})]", xpath_string(value)))
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy, self.value)
    }
}

fn css_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn xpath_string(value: &str) -> String {
    if !value.contains('"') {
        format!("\"{value}\"")
    } else if !value.contains('\'') {
        format!("'{value}'")
    } else {
        let parts: Vec<String> = value.split('"').map(|p| format!("\"{p}\"")).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

/// Waits for an element to be present after navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitCondition {
    /// Give up after this long. Zero disables waiting.
    pub timeout: Duration,
    pub locator: Locator,
}

impl WaitCondition {
    #[must_use]
    pub fn presence(locator: Locator, timeout: Duration) -> Self {
        Self { timeout, locator }
    }

    /// Builds a condition from names, e.g.
    /// `(10, "presence_of_element_located", "ID", "my-id")`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::UnsupportedWaitMethod`] or
    /// [`ConnectorError::UnknownLocatorStrategy`] for unrecognized names.
    pub fn from_parts(
        timeout_secs: u64,
        wait_method: &str,
        by: &str,
        expression: &str,
    ) -> Result<Self, ConnectorError> {
        if !wait_method.trim().eq_ignore_ascii_case(PRESENCE_OF_ELEMENT_LOCATED) {
            return Err(ConnectorError::UnsupportedWaitMethod {
                name: wait_method.to_string(),
            });
        }
        let strategy = by.parse::<LocatorStrategy>()?;
        Ok(Self::presence(
            Locator::new(strategy, expression),
            Duration::from_secs(timeout_secs),
        ))
    }
}

/// One live browser session.
///
/// Implementations own the underlying process or remote session.
/// [`BrowserConnector`] calls exactly one of `close` or `release_now`, once.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Loads `url` in the session's page.
    async fn navigate(&mut self, url: &str) -> Result<(), ConnectorError>;

    /// Whether an element matching `locator` is currently in the DOM.
    async fn is_present(&mut self, locator: &Locator) -> Result<bool, ConnectorError>;

    /// Serialized DOM of the current page.
    async fn page_source(&mut self) -> Result<String, ConnectorError>;

    /// Ends the session and releases its resources.
    async fn close(&mut self) -> Result<(), ConnectorError>;

    /// Releases the session without awaiting anything, e.g. by killing the
    /// browser process. Called from `Drop`, where no runtime may be running.
    fn release_now(&mut self);
}

/// Connector that renders pages in a real browser.
///
/// `post` is not supported. The session is released exactly once, by
/// [`BrowserConnector::disconnect`] or, failing that, on drop.
pub struct BrowserConnector {
    driver: Option<Box<dyn BrowserDriver>>,
    wait: Option<WaitCondition>,
    poll_interval: Duration,
    last_content: String,
}

impl fmt::Debug for BrowserConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserConnector")
            .field("connected", &self.driver.is_some())
            .field("wait", &self.wait)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl BrowserConnector {
    #[must_use]
    pub fn new(driver: Box<dyn BrowserDriver>) -> Self {
        Self {
            driver: Some(driver),
            wait: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            last_content: String::new(),
        }
    }

    #[must_use]
    pub fn with_wait(mut self, wait: WaitCondition) -> Self {
        self.wait = Some(wait);
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    #[must_use]
    pub fn wait_condition(&self) -> Option<&WaitCondition> {
        self.wait.as_ref()
    }

    fn driver_mut(&mut self) -> Result<&mut Box<dyn BrowserDriver>, ConnectorError> {
        self.driver.as_mut().ok_or(ConnectorError::Disconnected)
    }

    /// Navigates to `url`, waits for the configured condition and returns the page source.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::Disconnected`] after [`Self::disconnect`]
    /// - [`ConnectorError::WaitTimeout`] if the wait condition is not met in time
    /// - [`ConnectorError::Driver`] for driver failures
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&mut self, url: &str) -> Result<String, ConnectorError> {
        let wait = self.wait.clone();
        let poll_interval = self.poll_interval;
        let driver = self.driver_mut()?;

        driver.navigate(url).await?;
        if let Some(condition) = wait.filter(|w| !w.timeout.is_zero()) {
            wait_for_presence(driver, &condition, poll_interval).await?;
        }
        let content = driver.page_source().await?;
        info!(bytes = content.len(), "page rendered");

        self.last_content = content;
        Ok(self.last_content.clone())
    }

    /// Always fails: a scripted browser cannot submit arbitrary form bodies.
    ///
    /// # Errors
    ///
    /// Always returns [`ConnectorError::UnsupportedOperation`].
    pub fn post(&mut self, url: &str) -> Result<String, ConnectorError> {
        debug!(url = %url, "post rejected by browser connector");
        Err(ConnectorError::unsupported("post", "browser"))
    }

    #[must_use]
    pub fn last_content(&self) -> &str {
        &self.last_content
    }

    /// Writes the live page source to `path`, or the last fetched content
    /// once disconnected.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Driver`] or [`ConnectorError::Io`].
    pub async fn save_last_content(&mut self, path: &Path) -> Result<(), ConnectorError> {
        if let Some(driver) = self.driver.as_mut() {
            self.last_content = driver.page_source().await?;
        }
        tokio::fs::write(path, self.last_content.as_bytes())
            .await
            .map_err(|e| ConnectorError::io(path, e))
    }

    /// Closes the session. Further calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns the driver's close failure. The session counts as released either way.
    #[instrument(skip(self))]
    pub async fn disconnect(&mut self) -> Result<(), ConnectorError> {
        let Some(mut driver) = self.driver.take() else {
            debug!("browser session already closed");
            return Ok(());
        };
        driver.close().await?;
        info!("browser session closed");
        Ok(())
    }
}

impl Drop for BrowserConnector {
    fn drop(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            warn!("browser connector dropped without disconnect; releasing session");
            driver.release_now();
        }
    }
}

async fn wait_for_presence(
    driver: &mut Box<dyn BrowserDriver>,
    condition: &WaitCondition,
    poll_interval: Duration,
) -> Result<(), ConnectorError> {
    let deadline = Instant::now() + condition.timeout;
    loop {
        if driver.is_present(&condition.locator).await? {
            debug!(locator = %condition.locator, "wait condition satisfied");
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(ConnectorError::WaitTimeout {
                locator: condition.locator.to_string(),
                timeout: condition.timeout,
            });
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}
