//! Driving the Banner "Student Registration SSB" web UI through a browser.
//!
//! The flow for one course: navigate to the registration URL, log in if the
//! identity provider intervenes, pick the term, search for the course, and
//! read seat counts out of the results table.

pub mod checker;
pub mod chrome;
pub mod course;
pub mod errors;
pub mod extract;
pub mod inspect;
pub mod locator;
pub mod navigator;
pub mod search;
pub mod selectors;
pub mod session;
pub mod settings;

pub use checker::CourseChecker;
pub use chrome::{ChromeOptions, ChromeSession};
pub use course::CourseCode;
pub use errors::{CheckError, SessionError, TransportError};
pub use extract::Availability;
pub use navigator::{Navigator, PageState};
pub use session::{BrowserSession, SessionProvider};
pub use settings::{CheckSettings, Credentials, Timeouts};
