//! Login and term selection on the registration site.
//!
//! Where the session currently is (login page, term selection, class search)
//! is never stored: it is re-derived from the URL and page contents each time
//! a decision depends on it.

use super::errors::{CheckError, SessionError, TransportError};
use super::locator::{locate, locate_enabled};
use super::selectors;
use super::session::{BrowserSession, wait_for_target, wait_for_url};
use super::settings::CheckSettings;
use tracing::{debug, info, warn};

/// Where a session is in the registration flow, as observed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Unauthenticated,
    AtTermSelection,
    AtRegistrationSearch,
}

/// Drives one browser session through login and term selection.
pub struct Navigator<'a, S: BrowserSession + ?Sized> {
    session: &'a S,
    settings: &'a CheckSettings,
}

impl<'a, S: BrowserSession + ?Sized> Navigator<'a, S> {
    pub fn new(session: &'a S, settings: &'a CheckSettings) -> Self {
        Self { session, settings }
    }

    /// Load `url` and wait for the first form control to render.
    ///
    /// A slow render is not an error; later steps have their own waits.
    pub async fn navigate(&self, url: &str) -> Result<(), CheckError> {
        debug!(url, "navigating");
        self.session.navigate(url).await?;
        let rendered = wait_for_target(
            self.session,
            &selectors::INITIAL_RENDER,
            self.settings.timeouts.render,
        )
        .await?;
        if !rendered {
            debug!(url, "no form controls rendered yet, continuing");
        }
        Ok(())
    }

    pub async fn page_state(&self) -> Result<PageState, TransportError> {
        let url = self.current_url().await?;
        if selectors::is_login_url(&url) {
            return Ok(PageState::Unauthenticated);
        }
        if self.on_term_page().await? {
            return Ok(PageState::AtTermSelection);
        }
        Ok(PageState::AtRegistrationSearch)
    }

    /// Submit credentials if the current page is a login page.
    ///
    /// With no credentials configured, the session is assumed to be
    /// authenticated already (e.g. through a persisted browser profile).
    pub async fn ensure_logged_in(&self) -> Result<(), CheckError> {
        let Some(creds) = &self.settings.credentials else {
            debug!("no credentials configured, relying on browser profile");
            return Ok(());
        };

        let url = self.current_url().await?;
        if !selectors::is_login_url(&url) {
            debug!(url, "not on a login page");
            return Ok(());
        }
        info!(url, "login page detected, submitting credentials");

        // The identity provider often renders the form after the redirect settles.
        wait_for_target(self.session, &selectors::PASSWORD, self.settings.timeouts.render).await?;

        let username = locate(self.session, &selectors::USERNAME).await?;
        let password = locate(self.session, &selectors::PASSWORD).await?;
        let (Some(username), Some(password)) = (username, password) else {
            return Err(CheckError::LoginFieldsNotFound);
        };

        self.fill(&username, &creds.username).await?;
        self.fill(&password, &creds.password).await?;

        // Enter on the password field is enough for most identity providers.
        match self.session.press_enter(&password).await {
            Ok(()) => {
                if self.wait_until_logged_in().await? {
                    info!("login submitted with enter key");
                    self.wait_for_landing().await?;
                    return Ok(());
                }
                debug!("enter key did not leave the login page, trying sign-in button");
            }
            Err(SessionError::Transport(e)) => return Err(e.into()),
            Err(SessionError::Interaction(msg)) => {
                debug!(error = %msg, "enter key submission failed, trying sign-in button");
            }
        }

        let Some(button) = locate_enabled(self.session, &selectors::SIGN_IN).await? else {
            return Err(CheckError::LoginSubmissionFailed {
                url: self.current_url().await?,
            });
        };
        self.session.click(&button).await?;

        if self.wait_until_logged_in().await? {
            info!("login submitted with sign-in button");
            self.wait_for_landing().await?;
            return Ok(());
        }
        Err(CheckError::LoginSubmissionFailed {
            url: self.current_url().await?,
        })
    }

    /// Pick the configured term if the term selection step is showing.
    pub async fn ensure_term_selected(&self) -> Result<(), CheckError> {
        if !self.on_term_page().await? {
            debug!("term selection not shown, already at class search");
            return Ok(());
        }
        info!(term = self.settings.term, "term selection page detected");

        let Some(dropdown) = locate(self.session, &selectors::TERM_DROPDOWN).await? else {
            return Err(CheckError::TermSelectionFailed("term dropdown not found"));
        };
        self.session
            .click(&dropdown)
            .await
            .map_err(|e| interaction_as(e, "term dropdown could not be opened"))?;

        if !self.choose_term().await? {
            warn!(
                term = self.settings.term,
                "no input accepted the term filter, continuing with the preselected term"
            );
        }

        let Some(button) = locate_enabled(self.session, &selectors::CONTINUE).await? else {
            return Err(CheckError::TermSelectionFailed("continue button not found"));
        };
        self.session.click(&button).await?;

        let left = wait_for_term_page_exit(self.session, self.settings).await?;
        if left {
            info!(term = self.settings.term, "term selected");
        } else {
            warn!(term = self.settings.term, "still on term page after continuing");
        }
        Ok(())
    }

    /// Type the term label into the dropdown's filter box and confirm.
    ///
    /// Falls back to typing into the dropdown container when no filter box renders.
    async fn choose_term(&self) -> Result<bool, TransportError> {
        let timeouts = &self.settings.timeouts;
        wait_for_target(self.session, &selectors::TERM_SEARCH, timeouts.widget).await?;

        if let Some(input) = locate(self.session, &selectors::TERM_SEARCH).await? {
            match self.type_and_confirm(&input, false).await {
                Ok(()) => return Ok(true),
                Err(SessionError::Transport(e)) => return Err(e),
                Err(SessionError::Interaction(msg)) => {
                    debug!(error = %msg, "term search box rejected input");
                }
            }
        } else {
            debug!("no term search box, typing into dropdown container");
        }

        let Some(container) = locate(self.session, &selectors::TERM_CONTAINER).await? else {
            return Ok(false);
        };
        match self.type_and_confirm(&container, true).await {
            Ok(()) => Ok(true),
            Err(SessionError::Transport(e)) => Err(e),
            Err(SessionError::Interaction(msg)) => {
                debug!(error = %msg, "dropdown container rejected input");
                Ok(false)
            }
        }
    }

    async fn type_and_confirm(&self, element: &S::Element, focus_first: bool) -> Result<(), SessionError> {
        if focus_first {
            self.session.click(element).await?;
        } else {
            self.session.clear(element).await?;
        }
        self.session.type_text(element, &self.settings.term).await?;

        // Let the widget filter its options before confirming.
        let shown = wait_for_target(self.session, &selectors::TERM_OPTIONS, self.settings.timeouts.widget)
            .await?;
        if !shown {
            debug!("term options did not render, confirming anyway");
        }
        self.session.press_enter(element).await
    }

    async fn fill(&self, element: &S::Element, value: &str) -> Result<(), CheckError> {
        self.session.clear(element).await?;
        self.session.type_text(element, value).await?;
        Ok(())
    }

    async fn wait_until_logged_in(&self) -> Result<bool, TransportError> {
        wait_for_url(self.session, self.settings.timeouts.login, |url| {
            !selectors::is_login_url(url)
        })
        .await
    }

    /// The redirect after login lands before the next page has drawn.
    async fn wait_for_landing(&self) -> Result<(), TransportError> {
        let rendered = wait_for_target(
            self.session,
            &selectors::INITIAL_RENDER,
            self.settings.timeouts.render,
        )
        .await?;
        if !rendered {
            debug!("page after login has not rendered any form controls");
        }
        Ok(())
    }

    async fn on_term_page(&self) -> Result<bool, TransportError> {
        let source = self.page_source().await?;
        if source.to_lowercase().contains(selectors::TERM_PAGE_MARKER) {
            return Ok(true);
        }
        has_any(self.session, "select").await
    }

    async fn current_url(&self) -> Result<String, TransportError> {
        self.session.current_url().await.or_else(|e| match e {
            SessionError::Transport(t) => Err(t),
            SessionError::Interaction(_) => Ok(String::new()),
        })
    }

    async fn page_source(&self) -> Result<String, TransportError> {
        self.session.page_source().await.or_else(|e| match e {
            SessionError::Transport(t) => Err(t),
            SessionError::Interaction(_) => Ok(String::new()),
        })
    }
}

async fn has_any<S: BrowserSession + ?Sized>(session: &S, selector: &str) -> Result<bool, TransportError> {
    match session.find_all(selector).await {
        Ok(found) => Ok(!found.is_empty()),
        Err(SessionError::Transport(e)) => Err(e),
        Err(SessionError::Interaction(_)) => Ok(false),
    }
}

/// Wait for the term page marker to disappear after clicking continue.
async fn wait_for_term_page_exit<S: BrowserSession + ?Sized>(
    session: &S,
    settings: &CheckSettings,
) -> Result<bool, TransportError> {
    super::session::wait_until(settings.timeouts.render, || async move {
        let source = session.page_source().await?;
        Ok(!source.to_lowercase().contains(selectors::TERM_PAGE_MARKER))
    })
    .await
}

fn interaction_as(e: SessionError, reason: &'static str) -> CheckError {
    match e {
        SessionError::Transport(t) => CheckError::Transport(t),
        SessionError::Interaction(_) => CheckError::TermSelectionFailed(reason),
    }
}
