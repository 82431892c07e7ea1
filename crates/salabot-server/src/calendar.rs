//! Calendar views: month grouping, filtered listings, paging.

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};

use salabot_core::Reservation;
use salabot_protocol::{MonthYear, PageDirection};

use crate::error::{EngineError, EngineResult};

/// Every distinct month/year present in the collection (cancelled
/// included, as history), plus the current month, chronologically
/// ascending.
pub fn month_year_groups(reservations: &[Reservation], today: NaiveDate) -> Vec<MonthYear> {
    let mut months: BTreeSet<MonthYear> = reservations
        .iter()
        .map(|r| MonthYear::new(r.date.month(), r.date.year()))
        .collect();
    months.insert(MonthYear::new(today.month(), today.year()));
    months.into_iter().collect()
}

/// Non-cancelled reservations in the given month, sorted by meeting
/// start.
///
/// With `restrict_to`, only reservations where that user is the
/// organizer, the creator, or a participant are kept.
pub fn filter_by_month_year(
    reservations: &[Reservation],
    month: u32,
    year: i32,
    restrict_to: Option<&str>,
) -> Vec<Reservation> {
    let mut found: Vec<Reservation> = reservations
        .iter()
        .filter(|r| r.is_active())
        .filter(|r| r.date.month() == month && r.date.year() == year)
        .filter(|r| restrict_to.is_none_or(|user| r.involves(user)))
        .cloned()
        .collect();
    found.sort_by_key(|r| r.meeting_start());
    found
}

/// A materialized, fixed-page-size view over one listing.
///
/// Browsing starts on the last page (the most recent entries of the
/// month); movement clamps to `[0, last_page]`.
#[derive(Debug, Clone)]
pub struct Paginator {
    items: Vec<Reservation>,
    page_size: usize,
    page: usize,
}

impl Paginator {
    /// Creates a paginator positioned on the last page.
    pub fn new(items: Vec<Reservation>, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total = items.len().div_ceil(page_size).max(1);
        Self {
            items,
            page_size,
            page: total - 1,
        }
    }

    /// The current page index.
    pub fn page(&self) -> usize {
        self.page
    }

    /// The number of pages (at least 1, even when empty).
    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size).max(1)
    }

    /// The entries of the current page.
    pub fn current(&self) -> &[Reservation] {
        let start = self.page * self.page_size;
        let end = (start + self.page_size).min(self.items.len());
        &self.items[start.min(self.items.len())..end]
    }

    /// Moves the cursor one page, clamped to the valid range.
    pub fn step(&mut self, direction: PageDirection) -> usize {
        self.page = match direction {
            PageDirection::Previous => self.page.saturating_sub(1),
            PageDirection::Next => (self.page + 1).min(self.total_pages() - 1),
        };
        self.page
    }
}

/// Per-user calendar cursors. Like booking sessions these have no
/// expiry; absence of an entry is the "navigation expired" path.
#[derive(Debug, Default)]
pub struct PaginationCursors {
    cursors: HashMap<String, Paginator>,
}

impl PaginationCursors {
    /// Creates an empty cursor store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh cursor for the user, replacing any previous one,
    /// and returns it.
    pub fn open(&mut self, user_id: &str, items: Vec<Reservation>, page_size: usize) -> &Paginator {
        self.cursors
            .insert(user_id.to_string(), Paginator::new(items, page_size));
        &self.cursors[user_id]
    }

    /// Moves the user's cursor, failing when none is live.
    pub fn step(&mut self, user_id: &str, direction: PageDirection) -> EngineResult<&Paginator> {
        let cursor = self
            .cursors
            .get_mut(user_id)
            .ok_or(EngineError::NoActiveCursor)?;
        cursor.step(direction);
        Ok(cursor)
    }

    /// Drops the user's cursor, if any.
    pub fn close(&mut self, user_id: &str) -> bool {
        self.cursors.remove(user_id).is_some()
    }
}
