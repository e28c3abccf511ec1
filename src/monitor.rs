//! The long-running check loop: one batch per interval, alerts for open seats.

use crate::banner::{BrowserSession, CourseChecker, CourseCode, SessionProvider};
use crate::notify::{Delivery, Notifier};
use crate::utils::fmt_duration;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

/// Pause between two course checks in one batch.
pub const COURSE_DELAY: Duration = Duration::from_secs(2);

/// Tallies for one batch, mostly for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub open: usize,
    pub alerts_sent: usize,
    /// The browser died mid-batch; the remaining courses were skipped.
    pub session_lost: bool,
}

pub struct Monitor<P: SessionProvider, N: Notifier> {
    checker: CourseChecker,
    courses: Vec<CourseCode>,
    interval: Duration,
    checks_per_day: u32,
    course_delay: Duration,
    provider: P,
    notifier: N,
}

impl<P: SessionProvider, N: Notifier> Monitor<P, N> {
    pub fn new(
        checker: CourseChecker,
        courses: Vec<CourseCode>,
        interval: Duration,
        checks_per_day: u32,
        provider: P,
        notifier: N,
    ) -> Self {
        Self {
            checker,
            courses,
            interval,
            checks_per_day: checks_per_day.max(1),
            course_delay: COURSE_DELAY,
            provider,
            notifier,
        }
    }

    pub fn with_course_delay(mut self, delay: Duration) -> Self {
        self.course_delay = delay;
        self
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Run one batch immediately, then one per interval, until shutdown.
    ///
    /// A shutdown signal interrupts whatever check is in flight. The browser
    /// session is closed once, after the loop exits.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            courses = self.courses.len(),
            interval = fmt_duration(self.interval),
            "monitor started"
        );

        let mut session: Option<P::Session> = None;
        let mut cycles: u32 = 0;
        let mut next_run = Instant::now();

        loop {
            tokio::select! {
                _ = time::sleep_until(next_run) => {}
                _ = shutdown_rx.recv() => {
                    info!("monitor received shutdown signal");
                    break;
                }
            }
            next_run = Instant::now() + self.interval;

            tokio::select! {
                report = self.run_cycle(&mut session) => {
                    debug!(?report, "cycle complete");
                }
                _ = shutdown_rx.recv() => {
                    info!("monitor received shutdown signal during a check");
                    break;
                }
            }

            cycles += 1;
            if cycles >= self.checks_per_day {
                self.notifier.clear_cache();
                cycles = 0;
            }
        }

        if let Some(session) = session.take()
            && let Err(e) = session.close().await
        {
            warn!(error = %e, "failed to close browser session");
        }
        info!("monitor stopped");
    }

    /// Check every course once, launching a session first if there is none.
    ///
    /// A transport failure closes and drops the session so the next cycle starts fresh.
    pub async fn run_cycle(&self, slot: &mut Option<P::Session>) -> CycleReport {
        let mut report = CycleReport::default();
        let start = std::time::Instant::now();

        if slot.is_none() {
            match self.provider.launch().await {
                Ok(session) => *slot = Some(session),
                Err(e) => {
                    error!(error = %e, "could not start browser, retrying next cycle");
                    report.session_lost = true;
                    return report;
                }
            }
        }
        let Some(session) = slot.as_ref() else {
            return report;
        };

        info!(courses = self.courses.len(), "checking courses");
        for (i, code) in self.courses.iter().enumerate() {
            if i > 0 && !self.course_delay.is_zero() {
                time::sleep(self.course_delay).await;
            }

            let seats = match self.checker.check_course(session, code.as_str()).await {
                Ok(seats) => seats,
                Err(e) => {
                    error!(course = %code, error = %e, "browser session lost, abandoning cycle");
                    if let Err(e) = session.close().await {
                        debug!(error = %e, "closing dead session failed");
                    }
                    *slot = None;
                    report.session_lost = true;
                    return report;
                }
            };
            report.checked += 1;

            if seats == 0 {
                info!(course = %code, "no seats available");
                continue;
            }
            report.open += 1;
            info!(course = %code, seats, "seats available");

            match self.notifier.notify(code, seats).await {
                Ok(Delivery::Sent { .. }) => report.alerts_sent += 1,
                Ok(Delivery::Duplicate) => {}
                Err(e) => error!(course = %code, error = %e, "could not send alert"),
            }
        }

        info!(
            checked = report.checked,
            open = report.open,
            alerts = report.alerts_sent,
            duration = fmt_duration(start.elapsed()),
            "cycle finished"
        );
        report
    }
}
