//! The browser capabilities the scraper consumes, and bounded polling waits built on them.

use super::errors::{SessionError, TransportError};
use super::selectors::Target;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::trace;

/// First delay between polls; doubles each round up to [`MAX_POLL_INTERVAL`].
const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One interactive browser tab, exclusively owned by whoever is driving the site.
///
/// Implementations classify failures: anything that means the browser is gone
/// is a [`SessionError::Transport`]; a selector that fails to parse or an
/// element that went stale is a [`SessionError::Interaction`].
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<(), SessionError>;
    async fn current_url(&self) -> Result<String, SessionError>;
    /// Serialized DOM of the current page.
    async fn page_source(&self) -> Result<String, SessionError>;
    /// All elements matching a CSS selector, in document order.
    async fn find_all(&self, selector: &str) -> Result<Vec<Self::Element>, SessionError>;
    /// Rendered with a non-zero box and not hidden by `display` or `visibility`.
    async fn is_visible(&self, element: &Self::Element) -> Result<bool, SessionError>;
    async fn is_enabled(&self, element: &Self::Element) -> Result<bool, SessionError>;
    async fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, SessionError>;
    async fn click(&self, element: &Self::Element) -> Result<(), SessionError>;
    /// Empty a text input's value.
    async fn clear(&self, element: &Self::Element) -> Result<(), SessionError>;
    async fn type_text(&self, element: &Self::Element, text: &str) -> Result<(), SessionError>;
    async fn press_enter(&self, element: &Self::Element) -> Result<(), SessionError>;
    /// Release the browser. Calling it more than once is a no-op.
    async fn close(&self) -> Result<(), SessionError>;
}

/// Opens fresh browser sessions, e.g. after the previous one died.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self) -> Result<Self::Session, TransportError>;
}

/// Poll `probe` until it returns `true` or `timeout` elapses.
///
/// Returns `Ok(false)` on timeout. Interaction errors from the probe count as
/// "not yet"; only a transport failure aborts the wait.
pub async fn wait_until<F, Fut>(timeout: Duration, mut probe: F) -> Result<bool, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, SessionError>>,
{
    let deadline = Instant::now() + timeout;
    let mut interval = INITIAL_POLL_INTERVAL;

    loop {
        match probe().await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(SessionError::Transport(e)) => return Err(e),
            Err(SessionError::Interaction(msg)) => trace!(error = %msg, "probe failed, retrying"),
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        time::sleep(interval.min(deadline - now)).await;
        interval = (interval * 2).min(MAX_POLL_INTERVAL);
    }
}

/// Wait until any candidate of `target` is present in the DOM (visible or not).
pub async fn wait_for_target<S: BrowserSession + ?Sized>(
    session: &S,
    target: &Target,
    timeout: Duration,
) -> Result<bool, TransportError> {
    wait_until(timeout, || async move {
        for selector in target.candidates {
            match session.find_all(selector).await {
                Ok(found) if !found.is_empty() => return Ok(true),
                Ok(_) => {}
                Err(e @ SessionError::Transport(_)) => return Err(e),
                Err(SessionError::Interaction(_)) => {}
            }
        }
        Ok(false)
    })
    .await
}

/// Wait until the current URL satisfies `predicate`.
pub async fn wait_for_url<S, P>(
    session: &S,
    timeout: Duration,
    predicate: P,
) -> Result<bool, TransportError>
where
    S: BrowserSession + ?Sized,
    P: Fn(&str) -> bool,
{
    let predicate = &predicate;
    wait_until(timeout, || async move {
        let url = session.current_url().await?;
        Ok(predicate(&url))
    })
    .await
}
