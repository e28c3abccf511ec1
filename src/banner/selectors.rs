//! Declarative selector tables for every UI target the scraper touches.
//!
//! The registration site and its identity provider are third-party pages whose
//! markup shifts between deployments. Each logical target lists CSS selectors in
//! priority order; the locator takes the first visible match.

/// A logical UI target and its candidate selectors, most specific first.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub name: &'static str,
    pub candidates: &'static [&'static str],
}

/// URL fragments that mark a login or identity-provider page.
pub const LOGIN_INDICATORS: &[&str] = &[
    "login",
    "saml",
    "sign",
    "auth",
    "sts.dc-uoit.ca",
    "adfs",
    "shibboleth",
];

/// Lower-cased page text shown on the term selection step.
pub const TERM_PAGE_MARKER: &str = "terms open for registration";

/// Any rendered form control; used to decide the first page has drawn.
pub const INITIAL_RENDER: Target = Target {
    name: "initial render",
    candidates: &["input", "select", "form"],
};

pub const USERNAME: Target = Target {
    name: "username field",
    candidates: &[
        "input[placeholder*='Email']",
        "input[placeholder*='Banner']",
        "input[placeholder*='Student']",
        "input[placeholder*='ID']",
        "input[type='text']:first-of-type",
        "input[type='email']",
        "input[name*='user']",
        "input[name*='email']",
        "input[id*='user']",
        "input[id*='email']",
    ],
};

pub const PASSWORD: Target = Target {
    name: "password field",
    candidates: &[
        "input[placeholder*='Password']",
        "input[placeholder*='Network']",
        "input[type='password']",
        "input[name*='pass']",
        "input[id*='pass']",
    ],
};

pub const SIGN_IN: Target = Target {
    name: "sign-in button",
    candidates: &[
        "input[value*='Sign in']",
        "input[value*='Sign In']",
        "input[value*='LOGIN']",
        "input[value*='Login']",
        "button[type='submit']",
        "input[type='submit']",
        ".btn-primary",
        "#submitButton",
        "[role='button']",
    ],
};

/// The Select2 widget wrapping the term `<select>`.
pub const TERM_DROPDOWN: Target = Target {
    name: "term dropdown",
    candidates: &[
        "#s2id_txt_term .select2-choice",
        ".select2-container .select2-choice",
        ".term-combo2 .select2-choice",
        ".select2-choice",
    ],
};

/// The filter box Select2 renders once the dropdown is open.
pub const TERM_SEARCH: Target = Target {
    name: "term search box",
    candidates: &[
        ".select2-search input",
        ".select2-input",
        "#s2id_autogen1",
        ".select2-focusser",
        "input[class*='select2']",
        ".select2-container input",
    ],
};

/// Fallback typing target when no filter box appears.
pub const TERM_CONTAINER: Target = Target {
    name: "term dropdown container",
    candidates: &[".select2-container", ".select2-choice"],
};

/// Options listed by an open Select2 dropdown.
pub const TERM_OPTIONS: Target = Target {
    name: "term options",
    candidates: &[".select2-results li", ".select2-result"],
};

pub const CONTINUE: Target = Target {
    name: "continue button",
    candidates: &[
        "#term-go",
        "button[id='term-go']",
        "button.form-button",
        "button[data-endpoint*='term/search']",
        "input[value='Continue']",
        "input[value='CONTINUE']",
        "button[type='submit']",
        "input[type='submit']",
    ],
};

/// Present once the class search page is interactive.
pub const SEARCH_READY: Target = Target {
    name: "search page",
    candidates: &["input", "select", ".search"],
};

pub const COURSE_SEARCH: Target = Target {
    name: "course search field",
    candidates: &[
        "input[placeholder*='course']",
        "input[name*='course']",
        "input[id*='course']",
        "input[placeholder*='subject']",
        "input[name*='subject']",
        "input[id*='subject']",
        "input[type='text']",
    ],
};

pub const SEARCH_BUTTON: Target = Target {
    name: "search button",
    candidates: &[
        "input[value*='Search']",
        "button[id*='search']",
        ".search-button",
        ".btn-search",
    ],
};

/// Markup that appears once search results have rendered.
pub const RESULTS: Target = Target {
    name: "search results",
    candidates: &["table", ".search-results"],
};

/// True if `url` looks like a login or identity-provider page.
pub fn is_login_url(url: &str) -> bool {
    let url = url.to_lowercase();
    LOGIN_INDICATORS.iter().any(|k| url.contains(k))
}
