#![allow(dead_code)]

//! A scripted, in-memory registration site implementing `BrowserSession`.

use async_trait::async_trait;
use seatwatch::banner::{
    BrowserSession, CheckSettings, Credentials, SessionError, SessionProvider, Timeouts,
    TransportError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const BASE_URL: &str = "https://ssp.mycampus.ca/StudentRegistrationSsb/ssb/registration/registerPostSignIn?mode=registration&mepCode=UOIT";
pub const LOGIN_URL: &str = "https://sts.dc-uoit.ca/adfs/ls/?SAMLRequest=abc";
pub const TERM_URL: &str =
    "https://ssp.mycampus.ca/StudentRegistrationSsb/ssb/term/termSelection?mode=registration";
pub const SEARCH_URL: &str =
    "https://ssp.mycampus.ca/StudentRegistrationSsb/ssb/classSearch/classSearch";
pub const RESULTS_URL: &str =
    "https://ssp.mycampus.ca/StudentRegistrationSsb/ssb/searchResults/searchResults";

/// Which interaction moves the site to another page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Click,
    Enter,
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub name: &'static str,
    pub tag: &'static str,
    pub selectors: Vec<&'static str>,
    pub visible: bool,
    pub enabled: bool,
    pub goto: Option<(Trigger, usize)>,
}

impl FakeElement {
    pub fn new(name: &'static str, tag: &'static str, selectors: &[&'static str]) -> Self {
        Self {
            name,
            tag,
            selectors: selectors.to_vec(),
            visible: true,
            enabled: true,
            goto: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn on(mut self, trigger: Trigger, page: usize) -> Self {
        self.goto = Some((trigger, page));
        self
    }

    fn matches(&self, selector: &str) -> bool {
        self.tag == selector || self.selectors.contains(&selector)
    }
}

#[derive(Debug, Clone)]
pub enum PageHtml {
    Static(String),
    /// Chosen by the text last typed into the named element.
    ByQuery {
        element: &'static str,
        pages: HashMap<String, String>,
        fallback: String,
    },
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub url: &'static str,
    pub html: PageHtml,
    pub elements: Vec<FakeElement>,
    /// Reaching this page makes it where the base URL lands from then on.
    pub sticky: bool,
    /// Blank (no markup, no elements) for this long after each arrival.
    pub ready_after: Option<Duration>,
}

impl FakePage {
    pub fn new(url: &'static str, html: impl Into<String>) -> Self {
        Self {
            url,
            html: PageHtml::Static(html.into()),
            elements: Vec::new(),
            sticky: false,
            ready_after: None,
        }
    }

    pub fn with(mut self, element: FakeElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }

    pub fn ready_after(mut self, delay: Duration) -> Self {
        self.ready_after = Some(delay);
        self
    }
}

/// Handle to one element as found on a specific page visit.
#[derive(Debug, Clone)]
pub struct ElementHandle {
    page: usize,
    visit: usize,
    index: usize,
}

#[derive(Debug, Default)]
struct State {
    current: usize,
    landing: usize,
    visit: usize,
    arrived: Option<Instant>,
    transport_down: bool,
    lookups: Vec<String>,
    typed: Vec<(&'static str, String)>,
    last_typed: HashMap<&'static str, String>,
    clicks: Vec<&'static str>,
    enters: Vec<&'static str>,
    navigations: usize,
}

struct Inner {
    pages: Vec<FakePage>,
    state: Mutex<State>,
    closes: AtomicUsize,
}

/// Cheap-to-clone handle; clones share the same site state.
#[derive(Clone)]
pub struct FakeSite {
    inner: Arc<Inner>,
}

impl FakeSite {
    pub fn new(pages: Vec<FakePage>, landing: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                pages,
                state: Mutex::new(State {
                    current: landing,
                    landing,
                    ..State::default()
                }),
                closes: AtomicUsize::new(0),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().unwrap()
    }

    /// Every call from now on fails as if the browser had crashed.
    pub fn kill(&self) {
        self.state().transport_down = true;
    }

    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    pub fn typed(&self) -> Vec<(&'static str, String)> {
        self.state().typed.clone()
    }

    pub fn typed_into(&self, name: &str) -> Vec<String> {
        self.state()
            .typed
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn clicks(&self) -> Vec<&'static str> {
        self.state().clicks.clone()
    }

    pub fn enters(&self) -> Vec<&'static str> {
        self.state().enters.clone()
    }

    /// Every selector passed to `find_all`, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.state().lookups.clone()
    }

    pub fn navigations(&self) -> usize {
        self.state().navigations
    }

    pub fn current_page_url(&self) -> &'static str {
        let state = self.state();
        self.inner.pages[state.current].url
    }

    fn check_transport(state: &State) -> Result<(), SessionError> {
        if state.transport_down {
            return Err(TransportError("connection reset by peer".into()).into());
        }
        Ok(())
    }

    fn go(&self, state: &mut State, page: usize) {
        state.current = page;
        state.visit += 1;
        state.arrived = Some(Instant::now());
        if self.inner.pages[page].sticky {
            state.landing = page;
        }
    }

    fn is_ready(&self, state: &State) -> bool {
        match (self.inner.pages[state.current].ready_after, state.arrived) {
            (Some(delay), Some(arrived)) => arrived.elapsed() >= delay,
            _ => true,
        }
    }

    /// Resolve a handle against the current page, failing if the page has changed since.
    fn element(&self, state: &State, handle: &ElementHandle) -> Result<FakeElement, SessionError> {
        Self::check_transport(state)?;
        if handle.page != state.current || handle.visit != state.visit {
            return Err(SessionError::Interaction("stale element reference".into()));
        }
        Ok(self.inner.pages[handle.page].elements[handle.index].clone())
    }

    fn fire(&self, state: &mut State, element: &FakeElement, trigger: Trigger) {
        if let Some((t, page)) = element.goto
            && t == trigger
        {
            self.go(state, page);
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSite {
    type Element = ElementHandle;

    async fn navigate(&self, _url: &str) -> Result<(), SessionError> {
        let mut state = self.state();
        Self::check_transport(&state)?;
        state.navigations += 1;
        let landing = state.landing;
        self.go(&mut state, landing);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        let state = self.state();
        Self::check_transport(&state)?;
        Ok(self.inner.pages[state.current].url.to_string())
    }

    async fn page_source(&self) -> Result<String, SessionError> {
        let state = self.state();
        Self::check_transport(&state)?;
        if !self.is_ready(&state) {
            return Ok("<html><head></head><body></body></html>".to_string());
        }
        Ok(match &self.inner.pages[state.current].html {
            PageHtml::Static(html) => html.clone(),
            PageHtml::ByQuery {
                element,
                pages,
                fallback,
            } => state
                .last_typed
                .get(element)
                .and_then(|q| pages.get(q))
                .unwrap_or(fallback)
                .clone(),
        })
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<ElementHandle>, SessionError> {
        let mut state = self.state();
        Self::check_transport(&state)?;
        state.lookups.push(selector.to_string());
        if !self.is_ready(&state) {
            return Ok(Vec::new());
        }
        if selector.contains(":contains") {
            return Err(SessionError::Interaction(format!(
                "invalid selector: {selector}"
            )));
        }
        Ok(self.inner.pages[state.current]
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.matches(selector))
            .map(|(index, _)| ElementHandle {
                page: state.current,
                visit: state.visit,
                index,
            })
            .collect())
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool, SessionError> {
        let state = self.state();
        Ok(self.element(&state, element)?.visible)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, SessionError> {
        let state = self.state();
        Ok(self.element(&state, element)?.enabled)
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let state = self.state();
        let element = self.element(&state, element)?;
        Ok(match name {
            "name" | "id" => Some(element.name.replace(' ', "_")),
            "type" => element
                .selectors
                .iter()
                .find_map(|s| s.strip_prefix("input[type='"))
                .and_then(|s| s.split('\'').next())
                .map(str::to_string),
            _ => None,
        })
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        let mut state = self.state();
        let element = self.element(&state, element)?;
        if !element.visible {
            return Err(SessionError::Interaction("element not interactable".into()));
        }
        state.clicks.push(element.name);
        self.fire(&mut state, &element, Trigger::Click);
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), SessionError> {
        let mut state = self.state();
        let element = self.element(&state, element)?;
        state.last_typed.remove(element.name);
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), SessionError> {
        let mut state = self.state();
        let element = self.element(&state, element)?;
        if !element.enabled {
            return Err(SessionError::Interaction("element is disabled".into()));
        }
        state.typed.push((element.name, text.to_string()));
        state
            .last_typed
            .entry(element.name)
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn press_enter(&self, element: &ElementHandle) -> Result<(), SessionError> {
        let mut state = self.state();
        let element = self.element(&state, element)?;
        state.enters.push(element.name);
        self.fire(&mut state, &element, Trigger::Enter);
        Ok(())
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub const LOGIN: usize = 0;
pub const TERM: usize = 1;
pub const SEARCH: usize = 2;
pub const RESULTS: usize = 3;

/// Build a results page with one row per `(subject, course number, schedule type, status)`.
pub fn results_html(rows: &[(&str, &str, &str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(subject, number, schedule, status)| {
            format!(
                r#"<tr>
                    <td data-property="courseTitle">Some Course</td>
                    <td data-property="subject">{subject}</td>
                    <td data-property="courseNumber">{number}</td>
                    <td data-property="scheduleType">{schedule}</td>
                    <td data-property="status" title="{status}">{status}</td>
                </tr>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><table class="search-results"><thead><tr>
            <th>Title</th><th>Subject</th><th>Course</th><th>Type</th><th>Status</th>
        </tr></thead><tbody>{body}</tbody></table></body></html>"#
    )
}

/// Pages of [`banner_site`], indexed by [`LOGIN`], [`TERM`], [`SEARCH`] and [`RESULTS`].
pub fn banner_pages(results: &[(&str, String)]) -> Vec<FakePage> {
    let login = FakePage::new(
        LOGIN_URL,
        "<html><body><form><input name='username'><input type='password'></form></body></html>",
    )
    .with(FakeElement::new("username", "input", &["input[name*='user']"]))
    .with(FakeElement::new("password", "input", &["input[type='password']"]).on(Trigger::Enter, TERM));

    let term = FakePage::new(
        TERM_URL,
        "<html><body><h1>Terms Open for Registration</h1><select id='txt_term'></select></body></html>",
    )
    .sticky()
    .with(FakeElement::new("term select", "select", &["#txt_term"]).hidden())
    .with(FakeElement::new(
        "term dropdown",
        "a",
        &["#s2id_txt_term .select2-choice", ".select2-choice"],
    ))
    .with(FakeElement::new(
        "term search",
        "input",
        &[".select2-search input", ".select2-input"],
    ))
    .with(FakeElement::new("term option", "li", &[".select2-results li"]))
    .with(FakeElement::new("continue", "button", &["#term-go", "button[type='submit']"]).on(Trigger::Click, SEARCH));

    let search = FakePage::new(
        SEARCH_URL,
        "<html><body><div class='search'><input id='txt_subjectcoursecombo'></div></body></html>",
    )
    .with(
        FakeElement::new(
            "course search",
            "input",
            &["input[id*='course']", "input[type='text']"],
        )
        .on(Trigger::Enter, RESULTS),
    );

    let results_page = FakePage {
        url: RESULTS_URL,
        html: PageHtml::ByQuery {
            element: "course search",
            pages: results.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect(),
            fallback: results_html(&[]),
        },
        elements: vec![FakeElement::new("results table", "table", &[".search-results"])],
        sticky: false,
        ready_after: None,
    };

    vec![login, term, search, results_page]
}

/// The four-page registration flow: identity provider login, term selection,
/// class search, and results chosen by the course code typed into the search box.
pub fn banner_site(results: &[(&str, String)]) -> FakeSite {
    FakeSite::new(banner_pages(results), LOGIN)
}

/// Short timeouts so tests with paused time still exercise every wait.
pub fn settings(credentials: bool) -> CheckSettings {
    CheckSettings {
        base_url: BASE_URL.to_string(),
        credentials: credentials.then(|| Credentials {
            username: "100123456".to_string(),
            password: "correct horse".to_string(),
        }),
        term: "winter".to_string(),
        subject: "CSCI".to_string(),
        timeouts: Timeouts {
            render: Duration::from_secs(2),
            login: Duration::from_secs(2),
            widget: Duration::from_millis(500),
            search_ready: Duration::from_secs(2),
            submit: Duration::from_secs(1),
            results: Duration::from_secs(2),
        },
    }
}

/// Hands out pre-built sessions in order, then fails like a browser that will not start.
#[derive(Clone, Default)]
pub struct FakeProvider {
    sessions: Arc<Mutex<Vec<FakeSite>>>,
    launches: Arc<AtomicUsize>,
}

impl FakeProvider {
    pub fn new(sessions: Vec<FakeSite>) -> Self {
        let mut sessions = sessions;
        sessions.reverse();
        Self {
            sessions: Arc::new(Mutex::new(sessions)),
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    type Session = FakeSite;

    async fn launch(&self) -> Result<FakeSite, TransportError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| TransportError("no browser available".into()))
    }
}
