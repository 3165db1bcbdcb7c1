//! Plain HTTP connector with a persistent cookie jar.

use std::path::{Path, PathBuf};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use cookie_store::CookieStore;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use reqwest_cookie_store::CookieStoreMutex;
use tracing::{debug, info, instrument, warn};
use url::{Url, form_urlencoded};

use super::error::ConnectorError;
use super::query::create_get_url;
use crate::auth::{CookieError, load_cookie_file, save_cookie_file};
use crate::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::user_agent::UserAgent;

/// Default pause after every request.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(2);

/// Settings for [`RequestConnector`].
#[derive(Debug, Clone)]
pub struct RequestConnectorConfig {
    /// Netscape cookie file loaded at construction and used by [`RequestConnector::save_cookies`].
    pub cookie_file: PathBuf,
    /// Pause after each response. May be zero.
    pub delay: Duration,
    /// Headers added to every request, replacing caller headers of the same name.
    pub extra_headers: HeaderMap,
    /// `User-Agent` sent when neither the caller nor `extra_headers` set one.
    pub user_agent: UserAgent,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl RequestConnectorConfig {
    #[must_use]
    pub fn new(cookie_file: impl Into<PathBuf>) -> Self {
        Self {
            cookie_file: cookie_file.into(),
            delay: DEFAULT_REQUEST_DELAY,
            extra_headers: HeaderMap::new(),
            user_agent: UserAgent::default(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_extra_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.extra_headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: UserAgent) -> Self {
        self.user_agent = user_agent;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }
}

/// Stateless HTTP fetching with cookies carried across calls.
///
/// Every request sends the store's matching cookies and every response's
/// `Set-Cookie` headers update the store. After each response the connector
/// sleeps for the configured delay.
#[derive(Debug)]
pub struct RequestConnector {
    client: Client,
    jar: Arc<CookieStoreMutex>,
    config: RequestConnectorConfig,
    last_content: String,
    last_status: Option<StatusCode>,
    cookie_load_error: Option<CookieError>,
}

impl RequestConnector {
    /// Builds the connector and seeds the jar from `config.cookie_file`.
    ///
    /// A cookie file that fails to load is logged and recorded (see
    /// [`Self::cookie_load_error`]); the connector starts with an empty jar.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ClientBuild`] if the HTTP client cannot be built.
    #[instrument(skip(config), fields(cookie_file = %config.cookie_file.display()))]
    pub fn new(config: RequestConnectorConfig) -> Result<Self, ConnectorError> {
        let jar = Arc::new(CookieStoreMutex::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .gzip(true)
            .build()
            .map_err(|source| ConnectorError::ClientBuild { source })?;

        let mut connector = Self {
            client,
            jar,
            config,
            last_content: String::new(),
            last_status: None,
            cookie_load_error: None,
        };

        match connector.load_cookies() {
            Ok(count) => debug!(cookies = count, "cookie jar seeded"),
            Err(error) => {
                warn!(error = %error, "ignoring unreadable cookie file; starting with an empty jar");
                connector.store().clear();
                connector.cookie_load_error = Some(error);
            }
        }

        Ok(connector)
    }

    /// Sends a GET for `url` with `params` merged into its query string.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidUrl`], [`ConnectorError::Network`] or
    /// [`ConnectorError::Timeout`].
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
        let url = create_get_url(url, params);
        self.request(Method::GET, &url, None, headers).await
    }

    /// Sends a form-encoded POST.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
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
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
            .finish();
        self.request(Method::POST, url, Some(body), headers).await
    }

    #[instrument(skip_all, fields(%method, %url))]
    async fn request(
        &mut self,
        method: Method,
        url: &str,
        body: Option<String>,
        mut headers: HeaderMap,
    ) -> Result<String, ConnectorError> {
        Url::parse(url).map_err(|_| ConnectorError::InvalidUrl {
            url: url.to_string(),
        })?;

        for (name, value) in &self.config.extra_headers {
            headers.insert(name.clone(), value.clone());
        }
        if !headers.contains_key(USER_AGENT) {
            headers.insert(
                USER_AGENT,
                HeaderValue::from_static(self.config.user_agent.as_header_value()),
            );
        }

        let mut request = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request
                .header(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                )
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConnectorError::network(url, e))?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "non-success status");
        }
        let content = response
            .text()
            .await
            .map_err(|e| ConnectorError::network(url, e))?;
        info!(status = status.as_u16(), bytes = content.len(), "response received");

        self.last_status = Some(status);
        self.last_content = content;

        if !self.config.delay.is_zero() {
            debug!(delay = ?self.config.delay, "post-request delay");
            tokio::time::sleep(self.config.delay).await;
        }

        Ok(self.last_content.clone())
    }

    /// Body of the most recent response, empty before the first call.
    #[must_use]
    pub fn last_content(&self) -> &str {
        &self.last_content
    }

    /// Status of the most recent response.
    #[must_use]
    pub fn last_status(&self) -> Option<StatusCode> {
        self.last_status
    }

    /// Writes the most recent response body to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Io`] if the file cannot be written.
    pub async fn save_last_content(&self, path: &Path) -> Result<(), ConnectorError> {
        tokio::fs::write(path, self.last_content.as_bytes())
            .await
            .map_err(|e| ConnectorError::io(path, e))
    }

    /// Saves the jar to the configured cookie file.
    ///
    /// # Errors
    ///
    /// Returns [`CookieError::File`] if the file cannot be written.
    pub fn save_cookies(&self) -> Result<usize, CookieError> {
        save_cookie_file(&self.store(), &self.config.cookie_file)
    }

    /// Saves the jar to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CookieError::File`] if the file cannot be written.
    pub fn save_cookies_to(&self, path: &Path) -> Result<usize, CookieError> {
        save_cookie_file(&self.store(), path)
    }

    /// Merges cookies from the configured cookie file. A missing file loads nothing.
    ///
    /// # Errors
    ///
    /// Returns a [`CookieError`] if the file exists but is unreadable or corrupt.
    pub fn load_cookies(&self) -> Result<usize, CookieError> {
        load_cookie_file(&mut self.store(), &self.config.cookie_file)
    }

    /// Merges cookies from `path`. A missing file loads nothing.
    ///
    /// # Errors
    ///
    /// Returns a [`CookieError`] if the file exists but is unreadable or corrupt.
    pub fn load_cookies_from(&self, path: &Path) -> Result<usize, CookieError> {
        load_cookie_file(&mut self.store(), path)
    }

    /// The error recorded when the cookie file failed to load at construction.
    #[must_use]
    pub fn cookie_load_error(&self) -> Option<&CookieError> {
        self.cookie_load_error.as_ref()
    }

    /// Value of the first unexpired cookie named `name`.
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<String> {
        self.store()
            .iter_unexpired()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }

    /// Stores a cookie given in `Set-Cookie` syntax as if `url` had sent it.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidUrl`] if `url` does not parse, or
    /// [`ConnectorError::CookieRejected`] if the store refuses the cookie,
    /// e.g. because its `Domain` attribute does not match `url`.
    pub fn set_cookie(&self, url: &str, set_cookie: &str) -> Result<(), ConnectorError> {
        let parsed = Url::parse(url).map_err(|_| ConnectorError::InvalidUrl {
            url: url.to_string(),
        })?;
        self.store()
            .parse(set_cookie, &parsed)
            .map(|_| ())
            .map_err(|source| ConnectorError::CookieRejected {
                url: url.to_string(),
                source,
            })
    }

    /// The shared store reqwest reads and updates.
    #[must_use]
    pub fn cookie_jar(&self) -> &Arc<CookieStoreMutex> {
        &self.jar
    }

    fn store(&self) -> MutexGuard<'_, CookieStore> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn config(&self) -> &RequestConnectorConfig {
        &self.config
    }

    /// No session to release.
    pub fn disconnect(&mut self) {
        debug!("request connector has no session to close");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    const NO_PARAMS: &[(&str, &str)] = &[];

    fn connector(temp: &TempDir) -> RequestConnector {
        let config =
            RequestConnectorConfig::new(temp.path().join("cookies.txt")).with_delay(Duration::ZERO);
        RequestConnector::new(config).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = RequestConnectorConfig::new("c.txt");
        assert_eq!(config.delay, Duration::from_secs(2));
        assert!(config.extra_headers.is_empty());
        assert_eq!(config.user_agent, UserAgent::Chrome);
    }

    #[test]
    fn test_new_without_cookie_file_starts_empty() {
        let temp = TempDir::new().unwrap();
        let connector = connector(&temp);
        assert_eq!(connector.store().iter_any().count(), 0);
        assert!(connector.cookie_load_error().is_none());
        assert_eq!(connector.last_content(), "");
    }

    #[test]
    fn test_new_with_corrupt_cookie_file_records_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("cookies.txt"), "garbage\n").unwrap();

        let connector = connector(&temp);

        assert_eq!(connector.store().iter_any().count(), 0);
        assert!(matches!(
            connector.cookie_load_error(),
            Some(CookieError::NoCookiesFound { .. })
        ));
    }

    #[test]
    fn test_set_and_get_cookie() {
        let temp = TempDir::new().unwrap();
        let connector = connector(&temp);
        connector
            .set_cookie("http://example.com/", "sid=abc; Domain=example.com")
            .unwrap();
        assert_eq!(connector.get_cookie("sid").as_deref(), Some("abc"));
        assert_eq!(connector.get_cookie("other"), None);
    }

    #[test]
    fn test_set_cookie_rejects_foreign_domain_on_ip_host() {
        let temp = TempDir::new().unwrap();
        let connector = connector(&temp);

        let result = connector.set_cookie("http://127.0.0.1/", "sid=secret; Domain=0.0.1");
        assert!(matches!(result, Err(ConnectorError::CookieRejected { .. })));

        let other_host = Url::parse("http://10.0.0.1/").unwrap();
        assert_eq!(connector.store().get_request_values(&other_host).count(), 0);
        assert_eq!(connector.get_cookie("sid"), None);
    }

    #[test]
    fn test_ip_host_cookie_stays_on_its_host() {
        let temp = TempDir::new().unwrap();
        let connector = connector(&temp);
        connector.set_cookie("http://127.0.0.1/", "sid=local").unwrap();

        let store = connector.store();
        let same = Url::parse("http://127.0.0.1/page").unwrap();
        let other = Url::parse("http://10.0.0.1/page").unwrap();
        assert_eq!(store.get_request_values(&same).collect::<Vec<_>>(), [("sid", "local")]);
        assert_eq!(store.get_request_values(&other).count(), 0);
    }

    #[tokio::test]
    async fn test_get_merges_params_and_records_content() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/list"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("page two"))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let mut connector = connector(&temp);
        let body = connector
            .get(&format!("{}/list?page=1", server.uri()), &[("page", "2")], HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(body, "page two");
        assert_eq!(connector.last_content(), "page two");
        assert_eq!(connector.last_status(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_extra_headers_override_caller_headers() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(header("x-token", "from-config"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let config = RequestConnectorConfig::new(temp.path().join("cookies.txt"))
            .with_delay(Duration::ZERO)
            .with_extra_header(
                HeaderName::from_static("x-token"),
                HeaderValue::from_static("from-config"),
            );
        let mut connector = RequestConnector::new(config).unwrap();

        let mut caller = HeaderMap::new();
        caller.insert("x-token", HeaderValue::from_static("from-caller"));
        let body = connector.get(&server.uri(), NO_PARAMS, caller).await.unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_default_user_agent_sent() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(header("user-agent", UserAgent::Chrome.as_header_value()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let mut connector = connector(&temp);
        connector.get(&server.uri(), NO_PARAMS, HeaderMap::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_response_cookie_stored_and_sent_back() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "sid=s3cr3t; Path=/"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gallery"))
            .and(header("cookie", "sid=s3cr3t"))
            .respond_with(ResponseTemplate::new(200).set_body_string("members only"))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let mut connector = connector(&temp);
        connector
            .get(&format!("{}/login", server.uri()), NO_PARAMS, HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(connector.get_cookie("sid").as_deref(), Some("s3cr3t"));

        let body = connector
            .get(&format!("{}/gallery", server.uri()), NO_PARAMS, HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(body, "members only");
    }

    #[tokio::test]
    async fn test_post_sends_form_body() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("q=rust+lang&page=1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("results"))
            .expect(1)
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let mut connector = connector(&temp);
        let body = connector
            .post(
                &format!("{}/search", server.uri()),
                &[("q", "rust lang"), ("page", "1")],
                HeaderMap::new(),
            )
            .await
            .unwrap();
        assert_eq!(body, "results");
    }

    #[tokio::test]
    async fn test_delay_applied_after_response() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let config = RequestConnectorConfig::new(temp.path().join("cookies.txt"))
            .with_delay(Duration::from_millis(150));
        let mut connector = RequestConnector::new(config).unwrap();

        let started = std::time::Instant::now();
        connector.get(&server.uri(), NO_PARAMS, HeaderMap::new()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let temp = TempDir::new().unwrap();
        let mut connector = connector(&temp);
        let result = connector.get("not a url", NO_PARAMS, HeaderMap::new()).await;
        assert!(matches!(result, Err(ConnectorError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_save_last_content_writes_body() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>saved</html>"))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let mut connector = connector(&temp);
        connector.get(&server.uri(), NO_PARAMS, HeaderMap::new()).await.unwrap();

        let out = temp.path().join("page.html");
        connector.save_last_content(&out).await.unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "<html>saved</html>");
    }

    #[test]
    fn test_save_cookies_then_new_connector_loads_them() {
        let temp = TempDir::new().unwrap();
        let first = connector(&temp);
        first
            .set_cookie("https://example.com/", "sid=persisted; Domain=example.com")
            .unwrap();
        assert_eq!(first.save_cookies().unwrap(), 1);

        let second = connector(&temp);
        assert_eq!(second.get_cookie("sid").as_deref(), Some("persisted"));
    }
}
