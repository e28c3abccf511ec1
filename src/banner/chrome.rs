//! [`BrowserSession`] backed by a local Chrome over the DevTools protocol.

use super::errors::{SessionError, TransportError};
use super::session::{BrowserSession, SessionProvider};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

const IS_VISIBLE_JS: &str = "function() {
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    return style.display !== 'none' && style.visibility !== 'hidden'
        && rect.width > 0 && rect.height > 0;
}";

const IS_ENABLED_JS: &str = "function() { return !this.disabled; }";

const CLEAR_JS: &str = "function() {
    if ('value' in this) {
        this.value = '';
        this.dispatchEvent(new Event('input', { bubbles: true }));
    }
}";

/// How to launch the browser.
#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    pub headless: bool,
    /// Persisted profile, so an existing site login survives restarts.
    pub profile_dir: Option<PathBuf>,
    pub executable: Option<PathBuf>,
}

pub struct ChromeSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    closed: AtomicBool,
}

impl ChromeSession {
    pub async fn launch(options: &ChromeOptions) -> Result<Self, TransportError> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        // with_head means NOT headless
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(dir) = &options.profile_dir {
            builder = builder.user_data_dir(dir);
        }
        if let Some(path) = options.executable.clone().or_else(find_chrome) {
            debug!(path = %path.display(), "using chrome executable");
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| TransportError(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| TransportError(format!("failed to launch browser: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(TransportError(format!("failed to open page: {e}")));
            }
        };

        info!(
            headless = options.headless,
            profile = ?options.profile_dir,
            "browser launched"
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            closed: AtomicBool::new(false),
        })
    }

    async fn call_bool(&self, element: &Element, function: &str) -> Result<bool, SessionError> {
        let returns = element.call_js_fn(function, false).await.map_err(classify)?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

fn find_chrome() -> Option<PathBuf> {
    CHROME_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// Protocol errors scoped to one element, script or slow page load are
/// interaction failures; anything else means the connection to the browser is
/// unusable.
fn classify(e: CdpError) -> SessionError {
    match e {
        CdpError::Timeout
        | CdpError::Chrome(_)
        | CdpError::NotFound
        | CdpError::ScrollingFailed(_)
        | CdpError::JavascriptException(_)
        | CdpError::Serde(_) => SessionError::Interaction(e.to_string()),
        other => SessionError::Transport(TransportError(other.to_string())),
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.page.goto(url).await.map_err(classify)?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.page.url().await.map_err(classify)?.unwrap_or_default())
    }

    async fn page_source(&self) -> Result<String, SessionError> {
        self.page.content().await.map_err(classify)
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Element>, SessionError> {
        self.page.find_elements(selector).await.map_err(classify)
    }

    async fn is_visible(&self, element: &Element) -> Result<bool, SessionError> {
        self.call_bool(element, IS_VISIBLE_JS).await
    }

    async fn is_enabled(&self, element: &Element) -> Result<bool, SessionError> {
        self.call_bool(element, IS_ENABLED_JS).await
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, SessionError> {
        element.attribute(name).await.map_err(classify)
    }

    async fn click(&self, element: &Element) -> Result<(), SessionError> {
        element.click().await.map_err(classify)?;
        Ok(())
    }

    async fn clear(&self, element: &Element) -> Result<(), SessionError> {
        element.call_js_fn(CLEAR_JS, false).await.map_err(classify)?;
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<(), SessionError> {
        element.focus().await.map_err(classify)?;
        element.type_str(text).await.map_err(classify)?;
        Ok(())
    }

    async fn press_enter(&self, element: &Element) -> Result<(), SessionError> {
        element.press_key("Enter").await.map_err(classify)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), SessionError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut browser = self.browser.lock().await;
        let result = browser.close().await;
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        self.handler.abort();
        result.map_err(|e| SessionError::Transport(TransportError(e.to_string())))?;
        info!("browser closed");
        Ok(())
    }
}

#[async_trait]
impl SessionProvider for ChromeOptions {
    type Session = ChromeSession;

    async fn launch(&self) -> Result<ChromeSession, TransportError> {
        ChromeSession::launch(self).await
    }
}
