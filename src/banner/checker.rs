//! Runs one complete course check against a live session.

use super::course::CourseCode;
use super::errors::{CheckError, TransportError};
use super::extract::{self, Availability};
use super::navigator::Navigator;
use super::search::SearchDriver;
use super::selectors;
use super::session::{BrowserSession, wait_for_target};
use super::settings::CheckSettings;
use crate::utils::{fmt_duration, log_if_slow};
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, info, info_span, warn};

/// A healthy check takes a few seconds; past this the site is struggling.
const SLOW_CHECK: Duration = Duration::from_secs(45);

/// Drives navigation, search and extraction for each configured course.
#[derive(Debug, Clone)]
pub struct CourseChecker {
    settings: CheckSettings,
}

impl CourseChecker {
    pub fn new(settings: CheckSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CheckSettings {
        &self.settings
    }

    /// Seats available for `raw` (normalized first), or 0 if they could not be determined.
    ///
    /// Every step failure is logged and collapsed to 0. Only a dead browser
    /// connection is returned as an error.
    pub async fn check_course<S: BrowserSession + ?Sized>(
        &self,
        session: &S,
        raw: &str,
    ) -> Result<u32, TransportError> {
        let code = match raw.parse::<CourseCode>() {
            Ok(code) => code,
            Err(e) => {
                warn!(error = %e, "skipping blank course code");
                return Ok(0);
            }
        };

        match self.check_outcome(session, &code).await {
            Ok(availability) => Ok(availability.seats()),
            Err(CheckError::Transport(e)) => Err(e),
            Err(e) => {
                warn!(course = %code, error = %e, "course check failed, reporting 0 seats");
                Ok(0)
            }
        }
    }

    /// Like [`check_course`](Self::check_course), but keeps every failure and
    /// the distinction between "no such section" and "sections full".
    pub async fn check_outcome<S: BrowserSession + ?Sized>(
        &self,
        session: &S,
        code: &CourseCode,
    ) -> Result<Availability, CheckError> {
        let span = info_span!("check", course = %code);
        async move {
            let start = Instant::now();
            let navigator = Navigator::new(session, &self.settings);

            navigator.navigate(&self.settings.base_url).await?;

            navigator.ensure_logged_in().await.inspect_err(|e| {
                warn!(step = "login", error = %e, "login failed");
            })?;

            match navigator.ensure_term_selected().await {
                Ok(()) => {}
                Err(CheckError::Transport(e)) => return Err(e.into()),
                // The search page may still be reachable, so keep going.
                Err(e) => warn!(step = "term", error = %e, "term selection failed, continuing"),
            }

            SearchDriver::new(session, &self.settings.timeouts)
                .search(code)
                .await
                .inspect_err(|e| warn!(step = "search", error = %e, "search failed"))?;

            let results = self.settings.timeouts.results;
            if !wait_for_target(session, &selectors::RESULTS, results).await? {
                let e = CheckError::ResultsTimeout {
                    secs: results.as_secs(),
                };
                warn!(step = "results", error = %e, "no results rendered");
                return Err(e);
            }

            let html = session.page_source().await?;
            let availability = extract::extract(&html, code, &self.settings.subject);
            debug!(
                seats = availability.seats(),
                duration = fmt_duration(start.elapsed()),
                "check finished"
            );
            log_if_slow(start, SLOW_CHECK, "course check");
            Ok(availability)
        }
        .instrument(span)
        .await
    }

    /// Check each course in order on one session.
    ///
    /// Stops at the first transport failure, since nothing further can succeed
    /// on that session.
    pub async fn check_all<S: BrowserSession + ?Sized>(
        &self,
        session: &S,
        codes: &[CourseCode],
    ) -> Result<Vec<(CourseCode, u32)>, TransportError> {
        let mut results = Vec::with_capacity(codes.len());
        for code in codes {
            let seats = self.check_course(session, code.as_str()).await?;
            results.push((code.clone(), seats));
        }
        info!(
            courses = results.len(),
            open = results.iter().filter(|(_, s)| *s > 0).count(),
            "batch checked"
        );
        Ok(results)
    }
}
