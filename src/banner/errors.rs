//! Error types for driving the registration site.

/// The browser connection itself is unusable. Nothing further will succeed on
/// the session that produced it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("browser transport failure: {0}")]
pub struct TransportError(pub String);

/// Failure reported by a [`BrowserSession`](super::session::BrowserSession) call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A single interaction failed: invalid selector, detached element, script exception.
    #[error("browser interaction failed: {0}")]
    Interaction(String),
}

impl SessionError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Why a single course check could not produce a seat count.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckError {
    #[error("username or password field not found on login page")]
    LoginFieldsNotFound,
    #[error("still on a login page after submitting credentials (url: {url})")]
    LoginSubmissionFailed { url: String },
    #[error("term selection failed: {0}")]
    TermSelectionFailed(&'static str),
    #[error("course search field not found")]
    SearchFieldNotFound,
    #[error("search results did not appear within {secs}s")]
    ResultsTimeout { secs: u64 },
    #[error("{0}")]
    Interaction(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<SessionError> for CheckError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Transport(t) => Self::Transport(t),
            SessionError::Interaction(msg) => Self::Interaction(msg),
        }
    }
}
