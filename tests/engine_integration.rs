//! Integration tests for the resolution engine.
//!
//! The browser seam is replaced with scripted page drivers and a
//! launch-counting session provider, so chain ordering, short-circuiting,
//! and session lifecycle are verified without Chrome. Direct fetches hit a
//! wiremock server.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use firmgrab_core::session::{
    CaptureSignal, CapturedFile, DriverError, Locator, PageDriver, PageSession, SessionError,
    SessionProvider,
};
use firmgrab_core::{ScrapeConfig, ScrapeEngine};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Scripted page driver recording every call.
#[derive(Default)]
struct FakeDriver {
    anchors: Vec<String>,
    markup: String,
    capture: Option<CaptureSignal>,
    fallback_href: Option<String>,
    navigate_fault: bool,
    navigate_timeout: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeDriver {
    fn record(&self, call: &str) {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(call.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    fn clone_capture(&self) -> Option<CaptureSignal> {
        match &self.capture {
            Some(CaptureSignal::Saved(file)) => Some(CaptureSignal::Saved(file.clone())),
            Some(CaptureSignal::TimedOut) => Some(CaptureSignal::TimedOut),
            Some(CaptureSignal::Missing) => Some(CaptureSignal::Missing),
            None => None,
        }
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        self.record("navigate");
        if self.navigate_fault {
            return Err(DriverError::Protocol {
                message: format!("connection lost during navigation to {url}"),
            });
        }
        if self.navigate_timeout {
            return Err(DriverError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn dismiss(&self, _locator: &Locator) -> Result<bool, DriverError> {
        self.record("dismiss");
        Ok(false)
    }

    async fn click(&self, _locator: &Locator) -> Result<bool, DriverError> {
        self.record("click");
        Ok(false)
    }

    async fn href_of(&self, _locator: &Locator) -> Result<Option<String>, DriverError> {
        self.record("href_of");
        Ok(self.fallback_href.clone())
    }

    async fn anchor_hrefs(&self) -> Result<Vec<String>, DriverError> {
        self.record("anchor_hrefs");
        Ok(self.anchors.clone())
    }

    async fn markup(&self) -> Result<String, DriverError> {
        self.record("markup");
        Ok(self.markup.clone())
    }

    async fn click_and_await_download(
        &self,
        _locator: &Locator,
        _wait: Duration,
    ) -> Result<CaptureSignal, DriverError> {
        self.record("click_and_await_download");
        Ok(self.clone_capture().unwrap_or(CaptureSignal::Missing))
    }
}

/// Session wrapping a shared driver, counting closes.
struct SpySession {
    driver: Arc<FakeDriver>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl PageSession for SpySession {
    fn driver(&self) -> &dyn PageDriver {
        &*self.driver
    }

    async fn close(self: Box<Self>) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Provider counting launches and handing out sessions over one driver.
struct SpyProvider {
    driver: Arc<FakeDriver>,
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl SpyProvider {
    fn new(driver: FakeDriver) -> Self {
        Self {
            driver: Arc::new(driver),
            launches: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SessionProvider for SpyProvider {
    async fn open(&self, _config: &ScrapeConfig) -> Result<Box<dyn PageSession>, SessionError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SpySession {
            driver: Arc::clone(&self.driver),
            closes: Arc::clone(&self.closes),
        }))
    }
}

fn engine_with(driver: FakeDriver, download_dir: &std::path::Path) -> (ScrapeEngine, Arc<FakeDriver>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let provider = SpyProvider::new(driver);
    let driver = Arc::clone(&provider.driver);
    let launches = Arc::clone(&provider.launches);
    let closes = Arc::clone(&provider.closes);
    let engine = ScrapeEngine::with_provider(
        ScrapeConfig::new(download_dir),
        Arc::new(provider),
    );
    (engine, driver, launches, closes)
}

const TP_LINK_URL: &str = "https://www.tp-link.com/us/support/download/archer-c7/";

// ==================== Dispatcher ====================

#[tokio::test]
async fn test_unsupported_vendor_rejected_without_session() {
    let temp = TempDir::new().expect("temp dir");
    let (engine, _, launches, closes) = engine_with(FakeDriver::default(), temp.path());

    let result = engine.scrape("https://example.com/support/product").await;

    assert!(!result.is_success());
    assert!(!result.message.is_empty());
    assert_eq!(launches.load(Ordering::SeqCst), 0, "no session may be launched");
    assert_eq!(closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unparseable_target_rejected_without_session() {
    let temp = TempDir::new().expect("temp dir");
    let (engine, _, launches, _) = engine_with(FakeDriver::default(), temp.path());

    let result = engine.scrape("not a url at all").await;

    assert!(!result.is_success());
    assert_eq!(launches.load(Ordering::SeqCst), 0);
}

// ==================== Session lifecycle ====================

#[tokio::test]
async fn test_session_closed_once_on_not_found() {
    let temp = TempDir::new().expect("temp dir");
    let (engine, _, launches, closes) = engine_with(FakeDriver::default(), temp.path());

    let result = engine.scrape(TP_LINK_URL).await;

    assert!(!result.is_success());
    assert!(!result.message.is_empty());
    assert_eq!(launches.load(Ordering::SeqCst), 1);
    assert_eq!(closes.load(Ordering::SeqCst), 1, "release must run exactly once");
}

#[tokio::test]
async fn test_session_closed_once_on_navigation_fault() {
    let temp = TempDir::new().expect("temp dir");
    let driver = FakeDriver {
        navigate_fault: true,
        ..FakeDriver::default()
    };
    let (engine, _, _, closes) = engine_with(driver, temp.path());

    let result = engine.scrape(TP_LINK_URL).await;

    assert!(!result.is_success());
    assert!(result.message.contains("connection lost"));
    assert_eq!(closes.load(Ordering::SeqCst), 1, "fault path must still release");
}

#[tokio::test]
async fn test_navigation_timeout_is_soft() {
    // A timed-out navigation may leave a usable partial page; the chain
    // must still run against it and the session must still be released.
    let temp = TempDir::new().expect("temp dir");
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/firmware/slow.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"partial page fw".to_vec()))
        .mount(&mock_server)
        .await;

    let driver = FakeDriver {
        navigate_timeout: true,
        anchors: vec![format!("{}/firmware/slow.bin", mock_server.uri())],
        ..FakeDriver::default()
    };
    let (engine, driver, _, closes) = engine_with(driver, temp.path());

    let result = engine.scrape(TP_LINK_URL).await;

    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.file_name.as_deref(), Some("slow.bin"));
    let calls = driver.calls();
    assert!(calls.contains(&"anchor_hrefs".to_string()), "chain must run: {calls:?}");
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_session_closed_once_on_success() {
    let temp = TempDir::new().expect("temp dir");
    let captured = temp.path().join("ArcherC7_v2.zip");
    std::fs::write(&captured, b"payload").expect("write capture");
    let driver = FakeDriver {
        capture: Some(CaptureSignal::Saved(CapturedFile {
            path: captured,
            suggested_name: "ArcherC7_v2.zip".to_string(),
        })),
        ..FakeDriver::default()
    };
    let (engine, _, _, closes) = engine_with(driver, temp.path());

    let result = engine.scrape(TP_LINK_URL).await;

    assert!(result.is_success());
    assert_eq!(result.file_name.as_deref(), Some("ArcherC7_v2.zip"));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

// ==================== Chain ordering ====================

#[tokio::test]
async fn test_chain_short_circuits_after_anchor_hit() {
    let temp = TempDir::new().expect("temp dir");
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/firmware/v2.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"firmware".to_vec()))
        .mount(&mock_server)
        .await;

    let driver = FakeDriver {
        anchors: vec![format!("{}/firmware/v2.bin", mock_server.uri())],
        ..FakeDriver::default()
    };
    let (engine, driver, _, _) = engine_with(driver, temp.path());

    let result = engine.scrape(TP_LINK_URL).await;

    assert!(result.is_success(), "{}", result.message);
    let calls = driver.calls();
    assert!(calls.contains(&"anchor_hrefs".to_string()));
    assert!(
        !calls.contains(&"click_and_await_download".to_string()),
        "later heuristics must not run after an earlier hit: {calls:?}"
    );
    assert!(
        !calls.contains(&"markup".to_string()),
        "markup fallback must not run after an earlier hit: {calls:?}"
    );
}

#[tokio::test]
async fn test_chain_falls_through_to_markup_scan() {
    let temp = TempDir::new().expect("temp dir");
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dl/router.img"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image".to_vec()))
        .mount(&mock_server)
        .await;

    let driver = FakeDriver {
        markup: format!(
            r#"<html><body><a href="{}/dl/router.img">get it</a></body></html>"#,
            mock_server.uri()
        ),
        ..FakeDriver::default()
    };
    let (engine, driver, _, _) = engine_with(driver, temp.path());

    let result = engine.scrape(TP_LINK_URL).await;

    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.file_name.as_deref(), Some("router.img"));
    let calls = driver.calls();
    assert!(calls.contains(&"anchor_hrefs".to_string()), "earlier steps ran first");
    assert!(calls.contains(&"markup".to_string()));
}

// ==================== Download channels ====================

#[tokio::test]
async fn test_capture_timeout_falls_back_to_href_fetch() {
    let temp = TempDir::new().expect("temp dir");
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assets/fw.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"zipped".to_vec()))
        .mount(&mock_server)
        .await;

    let driver = FakeDriver {
        capture: Some(CaptureSignal::TimedOut),
        fallback_href: Some(format!("{}/assets/fw.zip", mock_server.uri())),
        ..FakeDriver::default()
    };
    let (engine, _, _, closes) = engine_with(driver, temp.path());

    let result = engine.scrape(TP_LINK_URL).await;

    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.file_name.as_deref(), Some("fw.zip"));
    assert!(temp.path().join("fw.zip").exists());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_candidate_fetch_http_error_reported_as_error_result() {
    let temp = TempDir::new().expect("temp dir");
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone/fw.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let driver = FakeDriver {
        anchors: vec![format!("{}/gone/fw.bin", mock_server.uri())],
        ..FakeDriver::default()
    };
    let (engine, _, _, closes) = engine_with(driver, temp.path());

    let result = engine.scrape(TP_LINK_URL).await;

    assert!(!result.is_success());
    assert!(result.message.contains("404"), "{}", result.message);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

// ==================== End-to-end scenarios ====================

/// Scenario A: a TP-Link-like page renders one firmware anchor; the
/// resolved absolute URL is fetched directly.
#[tokio::test]
async fn test_scenario_single_anchor_yields_named_file() {
    let temp = TempDir::new().expect("temp dir");
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/firmware/v2.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"binary payload".to_vec()))
        .mount(&mock_server)
        .await;

    let driver = FakeDriver {
        anchors: vec![
            "/support/faq".to_string(),
            format!("{}/firmware/v2.bin", mock_server.uri()),
        ],
        ..FakeDriver::default()
    };
    let (engine, _, _, _) = engine_with(driver, temp.path());

    let result = engine.scrape(TP_LINK_URL).await;

    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.file_name.as_deref(), Some("v2.bin"));
    let saved = std::fs::read(temp.path().join("v2.bin")).expect("saved file");
    assert_eq!(saved, b"binary payload");
}

/// Scenario B: nothing on the page qualifies; the chain exhausts and the
/// session-close spy records exactly one close.
#[tokio::test]
async fn test_scenario_barren_page_reports_error() {
    let temp = TempDir::new().expect("temp dir");
    let driver = FakeDriver {
        markup: "<html><body><p>No downloads here.</p></body></html>".to_string(),
        ..FakeDriver::default()
    };
    let (engine, _, launches, closes) = engine_with(driver, temp.path());

    let result = engine.scrape(TP_LINK_URL).await;

    assert!(!result.is_success());
    assert!(!result.message.is_empty());
    assert_eq!(launches.load(Ordering::SeqCst), 1);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

/// Scenario C: example.com is not a supported vendor; immediate error with
/// zero session launches.
#[tokio::test]
async fn test_scenario_example_com_immediate_error() {
    let temp = TempDir::new().expect("temp dir");
    let (engine, driver, launches, _) = engine_with(FakeDriver::default(), temp.path());

    let result = engine.scrape("https://example.com").await;

    assert!(!result.is_success());
    assert_eq!(launches.load(Ordering::SeqCst), 0);
    assert!(driver.calls().is_empty(), "no page interaction may occur");
}

// ==================== Netgear chain ====================

#[tokio::test]
async fn test_netgear_capture_persists_suggested_name() {
    let temp = TempDir::new().expect("temp dir");
    let captured = temp.path().join("R7000-V1.0.11.zip");
    std::fs::write(&captured, b"netgear fw").expect("write capture");
    let driver = FakeDriver {
        capture: Some(CaptureSignal::Saved(CapturedFile {
            path: captured,
            suggested_name: "R7000-V1.0.11.zip".to_string(),
        })),
        ..FakeDriver::default()
    };
    let (engine, driver, _, closes) = engine_with(driver, temp.path());

    let result = engine
        .scrape("https://www.netgear.com/support/product/r7000#download")
        .await;

    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.file_name.as_deref(), Some("R7000-V1.0.11.zip"));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    // The consent step ran before capture.
    let calls = driver.calls();
    let click_pos = calls.iter().position(|c| c == "click");
    let capture_pos = calls.iter().position(|c| c == "click_and_await_download");
    assert!(click_pos.expect("consent click") < capture_pos.expect("capture attempt"));
}
