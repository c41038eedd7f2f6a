//! Request state machine and listing pagination
//!
//! ```text
//! Idle ──begin──▶ Loading ──resolve──▶ Ready(value)
//!                    ▲                  Failed(error)
//!                    └──── page change / retry ───┘
//! ```
//!
//! Every `begin` hands out a ticket. Only the outcome carrying the latest
//! ticket is applied; an older request that resolves later is dropped, so a
//! slow earlier page can never overwrite a faster later one. Closing the
//! tracker (page unmount) drops every outcome that arrives afterwards.

use crate::{error::CatalogError, types::CatalogSnapshot};

/// Identifies one request issued through a [`RequestTracker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(u64);

/// State of the latest request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestState<T> {
    /// Nothing requested yet
    Idle,
    /// The latest request is in flight
    Loading,
    /// The latest request succeeded
    Ready(T),
    /// The latest request failed
    Failed(CatalogError),
}

impl<T> RequestState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&CatalogError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// What happened to a resolved outcome
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// The outcome became the current state
    Applied(Result<T, CatalogError>),
    /// A newer request superseded this one, or the tracker was closed
    Discarded,
}

impl<T> Resolution<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Tracks the latest of a stream of requests
#[derive(Debug, Clone)]
pub struct RequestTracker<T> {
    state: RequestState<T>,
    latest: u64,
    closed: bool,
}

impl<T> Default for RequestTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestTracker<T> {
    pub fn new() -> Self {
        Self {
            state: RequestState::Idle,
            latest: 0,
            closed: false,
        }
    }

    /// Starts a request, superseding any request in flight
    pub fn begin(&mut self) -> RequestTicket {
        self.latest += 1;
        self.state = RequestState::Loading;
        RequestTicket(self.latest)
    }

    /// True when `ticket` is still the one whose outcome will be applied
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        !self.closed && ticket.0 == self.latest
    }

    /// Applies an outcome if it belongs to the latest request
    pub fn resolve(&mut self, ticket: RequestTicket, outcome: Result<T, CatalogError>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                ticket = ticket.0,
                latest = self.latest,
                closed = self.closed,
                "Discarding superseded outcome"
            );
            return false;
        }

        self.state = match outcome {
            Ok(value) => RequestState::Ready(value),
            Err(error) => RequestState::Failed(error),
        };
        true
    }

    /// Stops applying outcomes for good
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn state(&self) -> &RequestState<T> {
        &self.state
    }
}

/// Why a page navigation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Already on page 1
    BeforeFirst,
    /// The configured page ceiling is reached
    PageCeiling,
    /// A short page showed there is no more data
    EndOfData,
    /// The page was closed
    Closed,
}

impl std::fmt::Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Boundary::BeforeFirst => "already on the first page",
            Boundary::PageCeiling => "page ceiling reached",
            Boundary::EndOfData => "no more data",
            Boundary::Closed => "page closed",
        };
        f.write_str(text)
    }
}

/// Pagination over the market listing
#[derive(Debug, Clone)]
pub struct Pager {
    page: u32,
    page_size: u32,
    max_pages: u32,
    /// Lowest page known to be the last one
    end_of_data_at: Option<u32>,
    tracker: RequestTracker<CatalogSnapshot>,
}

impl Pager {
    /// Creates a pager positioned on page 1, idle
    pub fn new(page_size: u32, max_pages: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
            end_of_data_at: None,
            tracker: RequestTracker::new(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn state(&self) -> &RequestState<CatalogSnapshot> {
        self.tracker.state()
    }

    /// Checks whether `page` may be requested
    pub fn check(&self, page: u32) -> Result<(), Boundary> {
        if self.tracker.is_closed() {
            return Err(Boundary::Closed);
        }
        if page < 1 {
            return Err(Boundary::BeforeFirst);
        }
        if page > self.max_pages {
            return Err(Boundary::PageCeiling);
        }
        if matches!(self.end_of_data_at, Some(last) if page > last) {
            return Err(Boundary::EndOfData);
        }
        Ok(())
    }

    /// Moves to `page` and starts loading it
    pub fn go_to(&mut self, page: u32) -> Result<RequestTicket, Boundary> {
        self.check(page)?;
        self.page = page;
        Ok(self.tracker.begin())
    }

    /// Moves forward one page
    pub fn next(&mut self) -> Result<RequestTicket, Boundary> {
        self.go_to(self.page.saturating_add(1))
    }

    /// Moves back one page. A no-op on page 1.
    pub fn previous(&mut self) -> Result<RequestTicket, Boundary> {
        if self.page <= 1 {
            return Err(Boundary::BeforeFirst);
        }
        self.go_to(self.page - 1)
    }

    /// Reloads the current page
    pub fn retry(&mut self) -> Result<RequestTicket, Boundary> {
        if self.tracker.is_closed() {
            return Err(Boundary::Closed);
        }
        Ok(self.tracker.begin())
    }

    pub fn can_go_previous(&self) -> bool {
        self.page > 1 && !self.tracker.is_closed()
    }

    pub fn can_go_next(&self) -> bool {
        self.check(self.page.saturating_add(1)).is_ok()
    }

    /// Applies a fetch outcome if `ticket` is still current
    pub fn resolve(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<CatalogSnapshot, CatalogError>,
    ) -> bool {
        let end_signal = match &outcome {
            Ok(snapshot) if self.tracker.is_current(ticket) => {
                Some((snapshot.page, snapshot.is_end_of_data()))
            }
            _ => None,
        };

        if !self.tracker.resolve(ticket, outcome) {
            return false;
        }

        match end_signal {
            Some((page, true)) => {
                tracing::debug!(page, "Reached end of data");
                self.end_of_data_at = Some(self.end_of_data_at.map_or(page, |p| p.min(page)));
            }
            // A full page means the data grew past an earlier short page
            Some((page, false)) if matches!(self.end_of_data_at, Some(last) if last <= page) => {
                self.end_of_data_at = None;
            }
            _ => {}
        }
        true
    }

    /// Stops applying outcomes; the page is gone
    pub fn close(&mut self) {
        self.tracker.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketEntry;

    fn snapshot(page: u32, size: u32, count: usize) -> CatalogSnapshot {
        let entries = (0..count)
            .map(|i| MarketEntry::new(format!("p{page}-{i}"), format!("Coin {i}"), "c", 1.0))
            .collect();
        CatalogSnapshot::new(page, size, entries)
    }

    #[test]
    fn test_starts_idle_on_page_one() {
        let pager = Pager::new(10, 5);
        assert_eq!(pager.page(), 1);
        assert_eq!(pager.state(), &RequestState::Idle);
        assert!(!pager.can_go_previous());
    }

    #[test]
    fn test_previous_on_first_page_is_noop() {
        let mut pager = Pager::new(10, 5);
        let ticket = pager.go_to(1).unwrap();
        pager.resolve(ticket, Ok(snapshot(1, 10, 10)));

        assert_eq!(pager.previous(), Err(Boundary::BeforeFirst));
        assert_eq!(pager.page(), 1);
        assert!(pager.state().ready().is_some());
    }

    #[test]
    fn test_full_page_enables_next() {
        let mut pager = Pager::new(10, 5);
        let ticket = pager.go_to(1).unwrap();
        assert!(pager.state().is_loading());
        assert!(pager.resolve(ticket, Ok(snapshot(1, 10, 10))));
        assert!(pager.can_go_next());
    }

    #[test]
    fn test_short_page_disables_next() {
        let mut pager = Pager::new(10, 100);
        let ticket = pager.go_to(2).unwrap();
        pager.resolve(ticket, Ok(snapshot(2, 10, 3)));

        assert!(!pager.can_go_next());
        assert_eq!(pager.next(), Err(Boundary::EndOfData));
        assert_eq!(pager.page(), 2);

        // Going back and forward again is still allowed up to the short page
        pager.previous().unwrap();
        assert!(pager.can_go_next());
    }

    #[test]
    fn test_page_ceiling() {
        let mut pager = Pager::new(10, 5);
        let ticket = pager.go_to(5).unwrap();
        pager.resolve(ticket, Ok(snapshot(5, 10, 10)));

        assert!(!pager.can_go_next());
        assert_eq!(pager.next(), Err(Boundary::PageCeiling));
        assert_eq!(pager.go_to(0), Err(Boundary::BeforeFirst));
    }

    #[test]
    fn test_later_request_wins() {
        let mut pager = Pager::new(10, 5);
        let slow = pager.go_to(1).unwrap();
        let fast = pager.next().unwrap();

        assert!(pager.resolve(fast, Ok(snapshot(2, 10, 10))));
        assert!(!pager.resolve(slow, Ok(snapshot(1, 10, 10))));

        assert_eq!(pager.page(), 2);
        assert_eq!(pager.state().ready().unwrap().page, 2);
    }

    #[test]
    fn test_superseded_short_page_does_not_mark_end() {
        let mut pager = Pager::new(10, 5);
        let stale = pager.go_to(1).unwrap();
        let current = pager.go_to(1).unwrap();

        assert!(!pager.resolve(stale, Ok(snapshot(1, 10, 2))));
        assert!(pager.can_go_next());
        assert!(pager.resolve(current, Ok(snapshot(1, 10, 10))));
        assert!(pager.can_go_next());
    }

    #[test]
    fn test_failure_then_retry() {
        let mut pager = Pager::new(10, 5);
        let ticket = pager.go_to(1).unwrap();
        pager.resolve(ticket, Err(CatalogError::fetch_failed("timeout")));
        assert!(pager.state().error().is_some());

        let ticket = pager.retry().unwrap();
        assert!(pager.state().is_loading());
        pager.resolve(ticket, Ok(snapshot(1, 10, 10)));
        assert!(pager.state().ready().is_some());
    }

    #[test]
    fn test_closed_pager_discards_outcomes() {
        let mut pager = Pager::new(10, 5);
        let ticket = pager.go_to(1).unwrap();
        pager.close();

        assert!(!pager.resolve(ticket, Ok(snapshot(1, 10, 10))));
        assert!(pager.state().is_loading());
        assert_eq!(pager.next(), Err(Boundary::Closed));
        assert_eq!(pager.retry(), Err(Boundary::Closed));
    }

    #[test]
    fn test_tracker_generic_over_payload() {
        let mut tracker: RequestTracker<String> = RequestTracker::new();
        let first = tracker.begin();
        let second = tracker.begin();
        assert!(!tracker.is_current(first));
        assert!(tracker.resolve(second, Ok("detail".to_string())));
        assert_eq!(tracker.state().ready().map(String::as_str), Some("detail"));
    }
}
