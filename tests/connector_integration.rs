//! Integration tests for the request and browser connectors.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tempfile::TempDir;
use webarchiver::auth::CookieError;
use webarchiver::{
    BrowserConnector, BrowserDriver, Connector, ConnectorError, Locator, RequestConnector,
    RequestConnectorConfig, WaitCondition,
};
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn no_delay(cookie_file: std::path::PathBuf) -> RequestConnectorConfig {
    RequestConnectorConfig::new(cookie_file).with_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_session_cookie_survives_reconnect_through_cookie_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string("user=reader&pass=s3cret"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=abc123; Path=/")
                .set_body_string("welcome"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/members"))
        .and(header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("members only"))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let cookie_file = temp.path().join("cookies.txt");

    let mut first = RequestConnector::new(no_delay(cookie_file.clone())).unwrap();
    let body = first
        .post(
            &format!("{}/login", server.uri()),
            &[("user", "reader"), ("pass", "s3cret")],
            HeaderMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(body, "welcome");
    assert_eq!(first.get_cookie("session").as_deref(), Some("abc123"));
    first.save_cookies().unwrap();
    drop(first);

    let mut second = Connector::from(RequestConnector::new(no_delay(cookie_file)).unwrap());
    let body = second
        .get(
            &format!("{}/members", server.uri()),
            &[] as &[(&str, &str)],
            HeaderMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(body, "members only");
}

#[tokio::test]
async fn test_extra_headers_and_params_reach_server() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(query_param("page", "2"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("results"))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = no_delay(temp.path().join("cookies.txt")).with_extra_header(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );
    let mut connector = RequestConnector::new(config).unwrap();

    let body = connector
        .get(
            &format!("{}/search?q=old", server.uri()),
            &[("q", "rust"), ("page", "2")],
            HeaderMap::new(),
        )
        .await
        .unwrap();

    assert_eq!(body, "results");
    assert_eq!(connector.last_content(), "results");
}

#[tokio::test]
async fn test_manually_set_cookie_is_sent() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/gallery"))
        .and(header("cookie", "age_check=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("gallery"))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let connector = RequestConnector::new(no_delay(temp.path().join("cookies.txt"))).unwrap();
    connector
        .set_cookie(&server.uri(), "age_check=1; Path=/")
        .unwrap();
    let mut connector = Connector::from(connector);

    let body = connector
        .get(
            &format!("{}/gallery", server.uri()),
            &[] as &[(&str, &str)],
            HeaderMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(body, "gallery");
}

#[test]
fn test_corrupt_cookie_file_is_ignored_by_constructor() {
    let temp = TempDir::new().unwrap();
    let cookie_file = temp.path().join("cookies.txt");
    std::fs::write(&cookie_file, "garbage line\nmore garbage\n").unwrap();

    let connector = RequestConnector::new(no_delay(cookie_file)).unwrap();

    assert_eq!(connector.cookie_jar().lock().unwrap().iter_any().count(), 0);
    assert!(matches!(
        connector.cookie_load_error(),
        Some(CookieError::NoCookiesFound { .. })
    ));
    assert!(connector.load_cookies().is_err());
}

/// Scripted driver: the element appears on the third presence check.
#[derive(Clone, Default)]
struct ScriptedDriver {
    visited: Arc<Mutex<Vec<String>>>,
    checks: Arc<Mutex<usize>>,
    closes: Arc<Mutex<usize>>,
    releases: Arc<Mutex<usize>>,
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), ConnectorError> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn is_present(&mut self, _locator: &Locator) -> Result<bool, ConnectorError> {
        let mut checks = self.checks.lock().unwrap();
        *checks += 1;
        Ok(*checks >= 3)
    }

    async fn page_source(&mut self) -> Result<String, ConnectorError> {
        Ok("<html><div id=\"content\"></div></html>".to_string())
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        *self.closes.lock().unwrap() += 1;
        Ok(())
    }

    fn release_now(&mut self) {
        *self.releases.lock().unwrap() += 1;
    }
}

#[tokio::test]
async fn test_browser_connector_waits_then_reads_page() {
    let driver = ScriptedDriver::default();
    let wait = WaitCondition::presence(Locator::id("content"), Duration::from_secs(5));
    let mut connector = Connector::from(
        BrowserConnector::new(Box::new(driver.clone()))
            .with_wait(wait)
            .with_poll_interval(Duration::from_millis(10)),
    );

    let html = connector
        .get("https://example.com/read", &[("chapter", "7")], HeaderMap::new())
        .await
        .unwrap();

    assert!(html.contains("id=\"content\""));
    assert_eq!(*driver.checks.lock().unwrap(), 3);
    assert_eq!(
        driver.visited.lock().unwrap().as_slice(),
        ["https://example.com/read?chapter=7"]
    );

    let temp = TempDir::new().unwrap();
    let saved = temp.path().join("page.html");
    connector.save_last_content(&saved).await.unwrap();
    assert_eq!(std::fs::read_to_string(saved).unwrap(), html);

    connector.disconnect().await.unwrap();
    drop(connector);
    assert_eq!(*driver.closes.lock().unwrap(), 1);
    assert_eq!(*driver.releases.lock().unwrap(), 0);
}

#[test]
fn test_browser_session_released_when_runtime_is_gone() {
    let driver = ScriptedDriver::default();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let mut connector = Connector::from(BrowserConnector::new(Box::new(driver.clone())));
    runtime.block_on(async {
        connector
            .get("https://example.com/", &[] as &[(&str, &str)], HeaderMap::new())
            .await
            .unwrap();
    });
    drop(runtime);

    drop(connector);

    assert_eq!(*driver.closes.lock().unwrap(), 0);
    assert_eq!(*driver.releases.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_browser_connector_times_out_when_element_never_appears() {
    #[derive(Default)]
    struct NeverPresent;

    #[async_trait]
    impl BrowserDriver for NeverPresent {
        async fn navigate(&mut self, _url: &str) -> Result<(), ConnectorError> {
            Ok(())
        }
        async fn is_present(&mut self, _locator: &Locator) -> Result<bool, ConnectorError> {
            Ok(false)
        }
        async fn page_source(&mut self) -> Result<String, ConnectorError> {
            Ok(String::new())
        }
        async fn close(&mut self) -> Result<(), ConnectorError> {
            Ok(())
        }
        fn release_now(&mut self) {}
    }

    let wait = WaitCondition::from_parts(1, "presence_of_element_located", "css selector", "#late")
        .unwrap();
    let mut connector = BrowserConnector::new(Box::new(NeverPresent))
        .with_wait(wait)
        .with_poll_interval(Duration::from_millis(50));

    let result = connector.get("https://example.com/").await;

    assert!(matches!(result, Err(ConnectorError::WaitTimeout { .. })));
    connector.disconnect().await.unwrap();
}
