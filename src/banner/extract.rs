//! Seat availability extraction from the class search results page.
//!
//! Banner renders search results as a table whose cells carry a
//! `data-property` attribute naming the column (`subject`, `courseNumber`,
//! `scheduleType`, `status`, ...). Only lecture sections of the watched course
//! count towards availability; labs and tutorials are ignored.

use super::course::CourseCode;
use html_scraper::{ElementRef, Html, Selector};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Schedule type that counts towards availability.
pub const LECTURE: &str = "Lecture";

/// Rows with fewer cells than this are headers or decoration.
const MIN_CELLS: usize = 5;

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());
static SUBJECT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[data-property='subject']").unwrap());
static COURSE_NUMBER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[data-property='courseNumber']").unwrap());
static SCHEDULE_TYPE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[data-property='scheduleType']").unwrap());
static STATUS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[data-property='status']").unwrap());

/// One section row from the results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRow {
    pub subject: String,
    pub course_number: String,
    pub schedule_type: String,
    pub status: String,
}

impl SectionRow {
    /// Read the four tagged cells from a `<tr>`. `None` if any is missing.
    fn from_row(row: ElementRef<'_>) -> Option<Self> {
        let subject = row.select(&SUBJECT_SEL).next()?;
        let course_number = row.select(&COURSE_NUMBER_SEL).next()?;
        let schedule_type = row.select(&SCHEDULE_TYPE_SEL).next()?;
        let status_cell = row.select(&STATUS_SEL).next()?;

        // The status cell's title holds the full "N of M seats remain" text;
        // the visible text is sometimes abbreviated.
        let status = status_cell
            .attr("title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| cell_text(status_cell));

        Some(Self {
            subject: cell_text(subject),
            course_number: cell_text(course_number),
            schedule_type: cell_text(schedule_type),
            status,
        })
    }

    /// Lecture section of `target` within the `subject` department.
    ///
    /// `target` may be the bare course number (`4020U`) or subject and number
    /// together (`CSCI4020U`).
    pub fn matches(&self, target: &CourseCode, subject: &str) -> bool {
        if self.subject != subject || self.schedule_type != LECTURE {
            return false;
        }
        let target = target.as_str();
        self.course_number == target
            || target
                .strip_prefix(self.subject.as_str())
                .is_some_and(|rest| rest == self.course_number)
    }

    pub fn seat_status(&self) -> SeatStatus {
        SeatStatus::parse(&self.status)
    }
}

/// Cell text with each text node trimmed and concatenated.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect()
}

/// How a section's status text was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatStatus {
    /// "3 of 30 Seats Remain"
    Remaining(u32),
    /// "3 of 30" with no trailing wording
    OfTotal { open: u32, total: u32 },
    /// "FULL: 0 of 30"
    Full,
    /// "OPEN", optionally with a count; no count means at least one seat.
    Open(Option<u32>),
    Unrecognized,
}

impl SeatStatus {
    pub fn parse(text: &str) -> Self {
        static SEATS_REMAINING_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?i)(\d+)\s*of\s*\d+\s*seats?\s*rem(?:ain)?").unwrap()
        });
        static OF_TOTAL_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(\d+)\s*of\s*(\d+)").unwrap());
        static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

        if let Some(caps) = SEATS_REMAINING_RE.captures(text) {
            return Self::Remaining(parse_count(&caps[1]));
        }
        if let Some(caps) = OF_TOTAL_RE.captures(text) {
            return Self::OfTotal {
                open: parse_count(&caps[1]),
                total: parse_count(&caps[2]),
            };
        }
        if text.contains("FULL:") && text.contains("0 of") {
            return Self::Full;
        }
        if text.to_uppercase().contains("OPEN") {
            return Self::Open(NUMBER_RE.find(text).map(|m| parse_count(m.as_str())));
        }
        Self::Unrecognized
    }

    pub fn seats(self) -> u32 {
        match self {
            Self::Remaining(n) => n,
            Self::OfTotal { open, .. } => open,
            Self::Full | Self::Unrecognized => 0,
            Self::Open(n) => n.unwrap_or(1),
        }
    }
}

/// Saturates absurdly long digit runs instead of failing.
fn parse_count(digits: &str) -> u32 {
    digits.parse().unwrap_or(u32::MAX)
}

/// Outcome of scanning a results page for one course.
///
/// Callers that only want a number use [`Availability::seats`], which reports
/// both `NotFound` and `FoundFull` as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// No matching lecture section on the page; the search may have failed or the markup changed.
    NotFound,
    FoundFull { sections: usize },
    Open { seats: u32, sections: usize },
}

impl Availability {
    pub fn seats(self) -> u32 {
        match self {
            Self::Open { seats, .. } => seats,
            Self::NotFound | Self::FoundFull { .. } => 0,
        }
    }
}

/// Every row (across all tables) that carries the four tagged cells and enough columns.
pub fn section_rows(html: &Html) -> Vec<SectionRow> {
    html.select(&TABLE_SEL)
        .flat_map(|table| table.select(&ROW_SEL))
        .filter(|row| row.select(&CELL_SEL).count() >= MIN_CELLS)
        .filter_map(SectionRow::from_row)
        .collect()
}

/// Scan a results page for lecture sections of `target` and report the best availability.
pub fn extract(page_html: &str, target: &CourseCode, subject: &str) -> Availability {
    let html = Html::parse_document(page_html);
    let rows = section_rows(&html);
    debug!(course = %target, rows = rows.len(), "parsed result rows");

    let mut sections = 0usize;
    let mut best = 0u32;

    for row in rows.iter().filter(|r| r.matches(target, subject)) {
        sections += 1;
        let status = row.seat_status();
        debug!(
            course = %target,
            status_text = row.status.as_str(),
            ?status,
            "matched lecture section"
        );
        best = best.max(status.seats());
    }

    let availability = match (sections, best) {
        (0, _) => Availability::NotFound,
        (n, 0) => Availability::FoundFull { sections: n },
        (n, seats) => Availability::Open { seats, sections: n },
    };

    match availability {
        Availability::NotFound => warn!(
            course = %target,
            subject,
            "no matching lecture sections in results"
        ),
        Availability::FoundFull { sections } => {
            info!(course = %target, sections, "all lecture sections full")
        }
        Availability::Open { seats, sections } => {
            info!(course = %target, seats, sections, "seats available")
        }
    }

    availability
}

/// [`extract`] collapsed to a seat count.
pub fn extract_seats(page_html: &str, target: &CourseCode, subject: &str) -> u32 {
    extract(page_html, target, subject).seats()
}
