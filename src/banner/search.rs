//! Course search form submission.

use super::course::CourseCode;
use super::errors::{CheckError, SessionError, TransportError};
use super::locator::{locate, locate_enabled};
use super::selectors;
use super::session::{BrowserSession, wait_for_target, wait_until};
use super::settings::Timeouts;
use tracing::debug;

/// Fills and submits the class search form for one course at a time.
pub struct SearchDriver<'a, S: BrowserSession + ?Sized> {
    session: &'a S,
    timeouts: &'a Timeouts,
}

impl<'a, S: BrowserSession + ?Sized> SearchDriver<'a, S> {
    pub fn new(session: &'a S, timeouts: &'a Timeouts) -> Self {
        Self { session, timeouts }
    }

    /// Type `code` into the course search field and submit it.
    ///
    /// Enter is tried first. The search button is clicked only when the page
    /// shows no reaction to it within the submit timeout. Results rendering is
    /// left to the caller.
    pub async fn search(&self, code: &CourseCode) -> Result<(), CheckError> {
        let ready =
            wait_for_target(self.session, &selectors::SEARCH_READY, self.timeouts.search_ready)
                .await?;
        if !ready {
            debug!(course = %code, "search page not interactive yet, trying anyway");
        }

        let Some(field) = locate(self.session, &selectors::COURSE_SEARCH).await? else {
            return Err(CheckError::SearchFieldNotFound);
        };

        self.session.clear(&field).await?;
        self.session.type_text(&field, code.as_str()).await?;
        let before = self.current_url().await?;
        self.session.press_enter(&field).await?;

        if self.wait_for_reaction(&before).await? {
            debug!(course = %code, "search submitted with enter key");
            return Ok(());
        }

        // Some deployments ignore Enter in the search box.
        let Some(button) = locate_enabled(self.session, &selectors::SEARCH_BUTTON).await? else {
            debug!(course = %code, "no reaction to enter key and no search button");
            return Ok(());
        };
        match self.session.click(&button).await {
            Ok(()) => debug!(course = %code, "search button clicked"),
            Err(SessionError::Transport(e)) => return Err(e.into()),
            Err(SessionError::Interaction(msg)) => {
                debug!(course = %code, error = %msg, "search button click failed");
            }
        }

        Ok(())
    }

    /// Wait until the URL moves away from `before` or results markup appears.
    async fn wait_for_reaction(&self, before: &str) -> Result<bool, TransportError> {
        let session = self.session;
        wait_until(self.timeouts.submit, || async move {
            if session.current_url().await? != before {
                return Ok(true);
            }
            for selector in selectors::RESULTS.candidates {
                if !session.find_all(selector).await?.is_empty() {
                    return Ok(true);
                }
            }
            Ok(false)
        })
        .await
    }

    async fn current_url(&self) -> Result<String, TransportError> {
        self.session.current_url().await.or_else(|e| match e {
            SessionError::Transport(t) => Err(t),
            SessionError::Interaction(_) => Ok(String::new()),
        })
    }
}
