//! Finds the first visible element for a selector table.

use super::errors::{SessionError, TransportError};
use super::selectors::Target;
use super::session::BrowserSession;
use tracing::{debug, trace};

/// Return the first visible element matching any of `target`'s candidates, in priority order.
///
/// `Ok(None)` means nothing matched; callers treat that as an ordinary outcome.
/// Candidates that fail (bad selector, element detached mid-check) are skipped.
pub async fn locate<S: BrowserSession + ?Sized>(
    session: &S,
    target: &Target,
) -> Result<Option<S::Element>, TransportError> {
    locate_where(session, target, false).await
}

/// Like [`locate`], but the element must also be enabled. Used for clickable controls.
pub async fn locate_enabled<S: BrowserSession + ?Sized>(
    session: &S,
    target: &Target,
) -> Result<Option<S::Element>, TransportError> {
    locate_where(session, target, true).await
}

async fn locate_where<S: BrowserSession + ?Sized>(
    session: &S,
    target: &Target,
    require_enabled: bool,
) -> Result<Option<S::Element>, TransportError> {
    for selector in target.candidates {
        let found = match session.find_all(selector).await {
            Ok(found) => found,
            Err(SessionError::Transport(e)) => return Err(e),
            Err(SessionError::Interaction(msg)) => {
                trace!(element = target.name, selector, error = %msg, "candidate failed");
                continue;
            }
        };

        for element in found {
            if accept(session, &element, require_enabled).await? {
                debug!(element = target.name, selector, "located element");
                return Ok(Some(element));
            }
        }
    }

    debug!(element = target.name, "no candidate matched");
    Ok(None)
}

async fn accept<S: BrowserSession + ?Sized>(
    session: &S,
    element: &S::Element,
    require_enabled: bool,
) -> Result<bool, TransportError> {
    let visible = match session.is_visible(element).await {
        Ok(v) => v,
        Err(SessionError::Transport(e)) => return Err(e),
        Err(SessionError::Interaction(_)) => false,
    };
    if !visible || !require_enabled {
        return Ok(visible);
    }
    match session.is_enabled(element).await {
        Ok(enabled) => Ok(enabled),
        Err(SessionError::Transport(e)) => Err(e),
        Err(SessionError::Interaction(_)) => Ok(false),
    }
}
