//! Headless-Chrome session provider and page driver over CDP.
//!
//! One [`CdpSession`] owns one browser process, one browsing context (every
//! launch gets a fresh ephemeral profile, so contexts are never shared
//! across requests), and one page carrying a spoofed client identity.
//! Download capture uses `Browser.setDownloadBehavior` with events enabled:
//! clicks race a bounded wait for the `downloadWillBegin` /
//! `downloadProgress` event pair, and completed payloads are renamed from
//! their GUID to the browser-suggested filename.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;
use crate::download::filename::{resolve_unique_path, sanitize_filename};
use crate::download::DEFAULT_FILENAME;

use super::driver::{CaptureSignal, CapturedFile, DriverError, Locator, PageDriver};
use super::{PageSession, SessionError, SessionProvider};

/// Launches one headless Chrome per session.
#[derive(Debug, Default)]
pub struct CdpSessionProvider;

impl CdpSessionProvider {
    /// Creates a new provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionProvider for CdpSessionProvider {
    async fn open(&self, config: &ScrapeConfig) -> Result<Box<dyn PageSession>, SessionError> {
        tokio::fs::create_dir_all(&config.download_dir)
            .await
            .map_err(|source| SessionError::DownloadDir {
                path: config.download_dir.clone(),
                source,
            })?;

        let browser_config = build_browser_config(config)?;

        info!(headless = config.headless, "launching browser");
        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(SessionError::launch)?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        // Anything failing past this point must tear the browser down
        // before surfacing, or the process leaks.
        match prepare_page(&browser, config).await {
            Ok(page) => Ok(Box::new(CdpSession {
                browser,
                handler_task,
                driver: CdpDriver {
                    page,
                    download_dir: config.download_dir.clone(),
                    click_timeout: config.click_timeout,
                },
            })),
            Err(error) => {
                warn!(error = %error, "session setup failed; closing browser");
                if let Err(close_error) = browser.close().await {
                    debug!(error = %close_error, "browser close after failed setup");
                }
                let _ = browser.wait().await;
                handler_task.abort();
                Err(error)
            }
        }
    }
}

fn build_browser_config(config: &ScrapeConfig) -> Result<BrowserConfig, SessionError> {
    let mut builder = BrowserConfig::builder();
    if let Some(executable) = &config.chrome_executable {
        builder = builder.chrome_executable(executable);
    }
    if !config.headless {
        builder = builder.with_head();
    }
    builder = builder
        .arg("--no-sandbox")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-blink-features=AutomationControlled");
    for arg in &config.chrome_args {
        builder = builder.arg(arg);
    }
    builder.build().map_err(SessionError::launch)
}

/// Opens the session page with a spoofed identity and download capture
/// pointed at the configured directory.
async fn prepare_page(browser: &Browser, config: &ScrapeConfig) -> Result<Page, SessionError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(SessionError::launch)?;

    page.execute(SetUserAgentOverrideParams::new(config.user_agent.clone()))
        .await
        .map_err(SessionError::launch)?;

    let behavior = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::AllowAndName)
        .download_path(config.download_dir.to_string_lossy().into_owned())
        .events_enabled(true)
        .build()
        .map_err(SessionError::launch)?;
    page.execute(behavior).await.map_err(SessionError::launch)?;

    Ok(page)
}

/// One open browser session: process, ephemeral context, page.
struct CdpSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    driver: CdpDriver,
}

#[async_trait]
impl PageSession for CdpSession {
    fn driver(&self) -> &dyn PageDriver {
        &self.driver
    }

    async fn close(mut self: Box<Self>) {
        if let Err(error) = self.driver.page.clone().close().await {
            debug!(error = %error, "page close reported an error");
        }
        if let Err(error) = self.browser.close().await {
            debug!(error = %error, "browser close reported an error");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        debug!("browser session released");
    }
}

/// [`PageDriver`] backed by one CDP page.
struct CdpDriver {
    page: Page,
    download_dir: PathBuf,
    click_timeout: Duration,
}

impl CdpDriver {
    async fn eval<T: DeserializeOwned>(&self, js: String) -> Result<T, DriverError> {
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(DriverError::protocol)?;
        result.into_value::<T>().map_err(DriverError::protocol)
    }

    /// Moves a completed GUID-named download to its suggested name.
    async fn persist_capture(
        &self,
        guid: &str,
        suggested_name: &str,
    ) -> Result<CapturedFile, DriverError> {
        let guid_path = self.download_dir.join(guid);
        let name = {
            let sanitized = sanitize_filename(suggested_name);
            if sanitized.is_empty() || sanitized == "_" {
                DEFAULT_FILENAME.to_string()
            } else {
                sanitized
            }
        };
        let target = resolve_unique_path(&self.download_dir, &name);
        tokio::fs::rename(&guid_path, &target)
            .await
            .map_err(|source| DriverError::Io {
                path: guid_path,
                source,
            })?;
        info!(path = %target.display(), "captured browser download");
        Ok(CapturedFile {
            path: target,
            suggested_name: name,
        })
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let navigation = async {
            self.page
                .goto(url.to_string())
                .await
                .map_err(DriverError::protocol)?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(DriverError::protocol)?;
            Ok::<(), DriverError>(())
        };
        match tokio::time::timeout(timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn dismiss(&self, locator: &Locator) -> Result<bool, DriverError> {
        let js = format!(
            "(() => {{ const el = {}; if (!el) return false; el.remove(); return true; }})()",
            locator_js(locator)
        );
        self.eval(js).await
    }

    async fn click(&self, locator: &Locator) -> Result<bool, DriverError> {
        let js = format!(
            "(() => {{ const el = {}; if (!el) return false; \
             el.scrollIntoView({{block: 'center'}}); el.click(); return true; }})()",
            locator_js(locator)
        );
        match tokio::time::timeout(self.click_timeout, self.eval::<bool>(js)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(locator = %locator, "click timed out");
                Ok(false)
            }
        }
    }

    async fn href_of(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        let js = format!(
            "(() => {{ const el = {}; return el ? el.getAttribute('href') : null; }})()",
            locator_js(locator)
        );
        self.eval(js).await
    }

    async fn anchor_hrefs(&self) -> Result<Vec<String>, DriverError> {
        let js = "Array.from(document.querySelectorAll('a'))\
                  .map(a => a.getAttribute('href')).filter(h => !!h)"
            .to_string();
        self.eval(js).await
    }

    async fn markup(&self) -> Result<String, DriverError> {
        self.page.content().await.map_err(DriverError::protocol)
    }

    async fn click_and_await_download(
        &self,
        locator: &Locator,
        wait: Duration,
    ) -> Result<CaptureSignal, DriverError> {
        let exists: bool = self
            .eval(format!("(() => !!({}))()", locator_js(locator)))
            .await?;
        if !exists {
            return Ok(CaptureSignal::Missing);
        }

        // Subscribe before clicking so the begin event cannot be missed.
        let mut will_begin = self
            .page
            .event_listener::<EventDownloadWillBegin>()
            .await
            .map_err(DriverError::protocol)?;
        let mut progress = self
            .page
            .event_listener::<EventDownloadProgress>()
            .await
            .map_err(DriverError::protocol)?;

        if !self.click(locator).await? {
            return Ok(CaptureSignal::Missing);
        }

        let capture = async {
            let Some(begin) = will_begin.next().await else {
                return Err(DriverError::protocol("download event stream closed"));
            };
            debug!(
                url = %begin.url,
                suggested = %begin.suggested_filename,
                "download started"
            );
            while let Some(event) = progress.next().await {
                if event.guid != begin.guid {
                    continue;
                }
                match event.state {
                    DownloadProgressState::Completed => {
                        return self
                            .persist_capture(&begin.guid, &begin.suggested_filename)
                            .await
                            .map(Some);
                    }
                    DownloadProgressState::Canceled => {
                        warn!(url = %begin.url, "browser canceled the download");
                        return Ok(None);
                    }
                    DownloadProgressState::InProgress => {
                        debug!(
                            received = event.received_bytes,
                            total = event.total_bytes,
                            "download progress"
                        );
                    }
                }
            }
            Err(DriverError::protocol("download progress stream closed"))
        };

        match tokio::time::timeout(wait, capture).await {
            Ok(Ok(Some(captured))) => Ok(CaptureSignal::Saved(captured)),
            Ok(Ok(None)) => Ok(CaptureSignal::TimedOut),
            Ok(Err(error)) => Err(error),
            Err(_) => {
                debug!(locator = %locator, "no download event within {wait:?}");
                Ok(CaptureSignal::TimedOut)
            }
        }
    }
}

/// JS expression evaluating to the first element matching `locator`, or null.
///
/// Text locators must pick the innermost matching element: an ancestor's
/// `textContent` contains every descendant's text, so a naive first match
/// over `querySelectorAll('*')` would always select the document root. The
/// generated expression keeps only matches none of whose children also
/// match.
fn locator_js(locator: &Locator) -> String {
    match locator {
        Locator::Css(selector) => format!("document.querySelector({})", js_string(selector)),
        Locator::Text { selector, text } => format!(
            "(() => {{ const text = {}; \
             const matches = Array.from(document.querySelectorAll({}))\
             .filter(el => (el.textContent || '').includes(text)); \
             return matches.find(el => !Array.from(el.children)\
             .some(child => (child.textContent || '').includes(text))) || null; }})()",
            js_string(text),
            js_string(selector)
        ),
    }
}

/// Quotes a Rust string as a JS string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""))
}
