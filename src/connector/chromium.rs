//! [`BrowserDriver`] backed by a local Chromium over the DevTools protocol.

use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::browser::{BrowserConnector, BrowserDriver, Locator, LocatorQuery, WaitCondition};
use super::error::ConnectorError;
use crate::user_agent::UserAgent;

/// Launch settings for [`ChromiumDriver`].
#[derive(Debug, Clone, Default)]
pub struct ChromiumOptions {
    /// Browser binary. Auto-detected when unset.
    pub executable: Option<PathBuf>,
    /// Show the browser window.
    pub headed: bool,
    pub user_agent: UserAgent,
    /// Extra command-line switches passed to the browser.
    pub args: Vec<String>,
}

/// One Chromium process with a single page.
///
/// The process is launched with kill-on-drop, so dropping the [`Browser`]
/// signals it without awaiting.
pub struct ChromiumDriver {
    browser: Option<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launches the browser and opens a blank page.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Driver`] if the browser cannot be launched.
    pub async fn launch(options: &ChromiumOptions) -> Result<Self, ConnectorError> {
        let mut builder = BrowserConfig::builder()
            .arg(format!("--user-agent={}", options.user_agent.as_header_value()));
        if options.headed {
            builder = builder.with_head();
        }
        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }
        for arg in &options.args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder.build().map_err(ConnectorError::driver)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(ConnectorError::driver)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    trace!(error = %e, "devtools handler stopped");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(ConnectorError::driver)?;
        debug!("chromium session started");

        Ok(Self {
            browser: Some(browser),
            page,
            handler,
        })
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), ConnectorError> {
        self.page.goto(url).await.map_err(ConnectorError::driver)?;
        Ok(())
    }

    async fn is_present(&mut self, locator: &Locator) -> Result<bool, ConnectorError> {
        let found = match locator.to_query() {
            LocatorQuery::Css(selector) => self.page.find_element(selector).await.map(|_| ()),
            LocatorQuery::XPath(expression) => self.page.find_xpath(expression).await.map(|_| ()),
        };
        presence(found)
    }

    async fn page_source(&mut self) -> Result<String, ConnectorError> {
        self.page.content().await.map_err(ConnectorError::driver)
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };
        let closed = browser.close().await.map_err(ConnectorError::driver);
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "chromium process did not exit cleanly");
        }
        self.handler.abort();
        closed.map(|_| ())
    }

    fn release_now(&mut self) {
        self.handler.abort();
        if self.browser.take().is_some() {
            debug!("chromium process killed");
        }
    }
}

fn presence(found: Result<(), CdpError>) -> Result<bool, ConnectorError> {
    match found {
        Ok(()) => Ok(true),
        Err(e) if is_missing_node(&e) => Ok(false),
        Err(e) => Err(ConnectorError::driver(e)),
    }
}

/// Whether a lookup failed only because no element matched.
///
/// The protocol reports an absent node as an error. Anything else, such as a
/// dead connection or a crashed tab, is a real failure.
fn is_missing_node(error: &CdpError) -> bool {
    const MISSING_NODE_MESSAGES: [&str; 2] = ["Could not find node", "No node with given id"];
    match error {
        CdpError::NotFound => true,
        CdpError::Chrome(_) | CdpError::ChromeMessage(_) => {
            let message = error.to_string();
            MISSING_NODE_MESSAGES.iter().any(|m| message.contains(m))
        }
        _ => false,
    }
}

impl BrowserConnector {
    /// Launches Chromium and wraps it in a connector.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Driver`] if the browser cannot be launched.
    pub async fn chromium(
        options: &ChromiumOptions,
        wait: Option<WaitCondition>,
    ) -> Result<Self, ConnectorError> {
        let driver = ChromiumDriver::launch(options).await?;
        let connector = Self::new(Box::new(driver));
        Ok(match wait {
            Some(wait) => connector.with_wait(wait),
            None => connector,
        })
    }
}
