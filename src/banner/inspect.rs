//! Page debugging aid: describe the form inputs the current page offers.
//!
//! Useful when the site's markup changes and the selector tables need updating.

use super::errors::{SessionError, TransportError};
use super::session::BrowserSession;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSummary {
    pub kind: String,
    pub name: Option<String>,
    pub id: Option<String>,
    pub placeholder: Option<String>,
    pub visible: bool,
}

impl fmt::Display for InputSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "type={} name={} id={} placeholder={}{}",
            self.kind,
            show(&self.name),
            show(&self.id),
            show(&self.placeholder),
            if self.visible { "" } else { " (hidden)" }
        )
    }
}

/// Every `<input>` on the page in document order. Inputs that vanish while
/// being read are skipped.
pub async fn list_inputs<S: BrowserSession + ?Sized>(
    session: &S,
) -> Result<Vec<InputSummary>, TransportError> {
    let elements = match session.find_all("input").await {
        Ok(elements) => elements,
        Err(SessionError::Transport(e)) => return Err(e),
        Err(SessionError::Interaction(_)) => return Ok(Vec::new()),
    };

    let mut inputs = Vec::with_capacity(elements.len());
    for element in &elements {
        match summarize(session, element).await {
            Ok(summary) => inputs.push(summary),
            Err(SessionError::Transport(e)) => return Err(e),
            Err(SessionError::Interaction(_)) => continue,
        }
    }
    Ok(inputs)
}

async fn summarize<S: BrowserSession + ?Sized>(
    session: &S,
    element: &S::Element,
) -> Result<InputSummary, SessionError> {
    Ok(InputSummary {
        kind: session
            .attribute(element, "type")
            .await?
            .unwrap_or_else(|| "text".to_string()),
        name: session.attribute(element, "name").await?,
        id: session.attribute(element, "id").await?,
        placeholder: session.attribute(element, "placeholder").await?,
        visible: session.is_visible(element).await?,
    })
}
