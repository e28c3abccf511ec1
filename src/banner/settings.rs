//! Per-check settings handed to the navigator, search driver and orchestrator.

use std::time::Duration;

/// Site login credentials. Absent when the browser profile already holds a session.
#[derive(Clone, custom_debug_derive::Debug)]
pub struct Credentials {
    pub username: String,
    #[debug(with = "crate::fmt::redacted")]
    pub password: String,
}

/// Bounds for every condition wait in a course check.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// First form controls after a navigation; also the term page exit.
    pub render: Duration,
    /// URL leaving the login page after submitting credentials.
    pub login: Duration,
    /// Select2 filter box and option list.
    pub widget: Duration,
    /// Class search form becoming interactive.
    pub search_ready: Duration,
    /// Page reacting to the submit key before the search button is tried.
    pub submit: Duration,
    pub results: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            render: Duration::from_secs(10),
            login: Duration::from_secs(5),
            widget: Duration::from_secs(2),
            search_ready: Duration::from_secs(15),
            submit: Duration::from_secs(2),
            results: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckSettings {
    pub base_url: String,
    pub credentials: Option<Credentials>,
    /// Fragment of the term label typed into the term dropdown, e.g. `winter`.
    pub term: String,
    /// Department whose sections are considered, e.g. `CSCI`.
    pub subject: String,
    pub timeouts: Timeouts,
}
