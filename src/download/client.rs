//! HTTP client wrapper for fetching single resources.
//!
//! This module provides the `HttpClient` struct which streams a response body
//! into a file or a caller-owned writer, with browser-like default headers.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder, Proxy};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent::UserAgent;

/// Label used in errors for writer sinks, which have no path.
const STREAM_SINK_LABEL: &str = "<stream>";

/// Client-level transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
    /// Preset sent as `User-Agent` when a request does not carry one.
    pub user_agent: UserAgent,
    /// Proxy URL applied to every scheme.
    pub proxy: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            user_agent: UserAgent::default(),
            proxy: None,
        }
    }
}

/// Per-request options passed through to the transport without interpretation.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Extra request headers. A `User-Agent` here replaces the default one.
    pub headers: HeaderMap,
    /// Overrides the client's request timeout for this fetch.
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets a per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Where a fetched body goes.
pub enum Sink<'a> {
    /// A file path, created or truncated, written, then closed.
    Path(&'a Path),
    /// An already-open writer owned by the caller. It is flushed but not closed.
    Writer(&'a mut (dyn AsyncWrite + Unpin + Send)),
}

impl std::fmt::Debug for Sink<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

/// HTTP client for fetching resources with streaming support.
///
/// This client is designed to be created once and reused for a whole
/// collection, taking advantage of connection pooling.
///
/// # Example
///
/// ```no_run
/// use webarchiver::download::{FetchOptions, HttpClient, Sink};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let bytes = client
///     .fetch("https://example.com/logo.png", Sink::Path(Path::new("logo.png")), &FetchOptions::default())
///     .await?;
/// println!("wrote {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: UserAgent,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts and the Chrome preset.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_config(&FetcherConfig::default())
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a new HTTP client from explicit transport settings.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the proxy URL is invalid or the
    /// TLS backend cannot be initialized.
    #[instrument(level = "debug")]
    pub fn with_config(config: &FetcherConfig) -> Result<Self, DownloadError> {
        let client = build_client(config).map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self {
            client,
            user_agent: config.user_agent,
        })
    }

    /// Fetches `url` and writes the response body to `sink`.
    ///
    /// The body is written verbatim whatever the HTTP status; a non-success
    /// status is only logged. A `User-Agent` is attached unless `options`
    /// already carries one.
    ///
    /// # Returns
    ///
    /// The number of body bytes written.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - Writing the sink fails (a partially written file sink is removed)
    #[instrument(skip(self, sink, options), fields(url = %url))]
    pub async fn fetch(
        &self,
        url: &str,
        sink: Sink<'_>,
        options: &FetchOptions,
    ) -> Result<u64, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self.send_request(url, options).await?;
        let status = response.status();
        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                "non-success status; writing response body as received"
            );
        }

        let bytes_written = match sink {
            Sink::Path(path) => {
                let mut file = File::create(path)
                    .await
                    .map_err(|e| DownloadError::io(path, e))?;
                let stream_result = stream_to_writer(&mut file, response, url, path).await;
                drop(file);
                if stream_result.is_err() {
                    debug!(path = %path.display(), "cleaning up partial file after error");
                    let _ = tokio::fs::remove_file(path).await;
                }
                stream_result?
            }
            Sink::Writer(writer) => {
                stream_to_writer(writer, response, url, Path::new(STREAM_SINK_LABEL)).await?
            }
        };

        info!(bytes = bytes_written, status = status.as_u16(), "fetch complete");
        Ok(bytes_written)
    }

    /// Fetches `url` into the file at `path` with default options.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`fetch`](Self::fetch).
    pub async fn fetch_to_path(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        self.fetch(url, Sink::Path(path), &FetchOptions::default())
            .await
    }

    async fn send_request(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<reqwest::Response, DownloadError> {
        let mut request = self.client.get(url).headers(options.headers.clone());
        if !options.headers.contains_key(USER_AGENT) {
            request = request.header(USER_AGENT, self.user_agent.as_header_value());
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        request
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))
    }

    /// Returns the preset sent when a request has no `User-Agent`.
    #[must_use]
    pub fn user_agent(&self) -> UserAgent {
        self.user_agent
    }
}

/// Streams response body into `writer`, returning bytes written.
///
/// This is extracted to enable cleanup on error in the caller.
async fn stream_to_writer<W>(
    writer: &mut W,
    response: reqwest::Response,
    url: &str,
    sink_path: &Path,
) -> Result<u64, DownloadError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut writer = BufWriter::new(writer);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(sink_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    // Ensure all data reaches the underlying sink
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(sink_path, e))?;

    Ok(bytes_written)
}

fn build_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let mut builder: ClientBuilder = Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.read_timeout_secs))
        .gzip(true);
    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }
    builder.build()
}
