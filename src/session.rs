//! Page sessions: the listing, search and detail views' handles into the engine
//!
//! A session is cheap to clone; clones share state, so a navigation issued
//! from one task supersedes a fetch another task is still waiting on. No
//! lock is held while a fetch is in flight.

use crate::{
    catalog::CatalogCache,
    error::CatalogError,
    pager::{Boundary, Pager, RequestState, RequestTicket, RequestTracker, Resolution},
    search::{SearchIndex, SearchOptions},
    types::{CatalogSnapshot, CoinDetail, MarketEntry},
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The paginated market listing
#[derive(Clone)]
pub struct ListingPage {
    catalog: CatalogCache,
    pager: Arc<RwLock<Pager>>,
}

impl ListingPage {
    pub fn new(catalog: CatalogCache, page_size: u32, max_pages: u32) -> Self {
        Self {
            catalog,
            pager: Arc::new(RwLock::new(Pager::new(page_size, max_pages))),
        }
    }

    /// Loads page `page`
    ///
    /// # Returns
    /// `Err(Boundary)` when the page may not be requested. Otherwise the
    /// fetch outcome, or `Resolution::Discarded` if another navigation
    /// superseded this one while it was in flight.
    pub async fn list_page(&self, page: u32) -> Result<Resolution<CatalogSnapshot>, Boundary> {
        self.navigate(|pager| pager.go_to(page)).await
    }

    /// Loads the next page
    pub async fn next(&self) -> Result<Resolution<CatalogSnapshot>, Boundary> {
        self.navigate(Pager::next).await
    }

    /// Loads the previous page. Refused on page 1.
    pub async fn previous(&self) -> Result<Resolution<CatalogSnapshot>, Boundary> {
        self.navigate(Pager::previous).await
    }

    /// Reloads the current page after a failure
    pub async fn retry(&self) -> Result<Resolution<CatalogSnapshot>, Boundary> {
        self.navigate(Pager::retry).await
    }

    async fn navigate<F>(&self, step: F) -> Result<Resolution<CatalogSnapshot>, Boundary>
    where
        F: FnOnce(&mut Pager) -> Result<RequestTicket, Boundary>,
    {
        let (ticket, page, page_size) = {
            let mut pager = self.pager.write().await;
            let ticket = step(&mut pager)?;
            (ticket, pager.page(), pager.page_size())
        };

        tracing::debug!(page, page_size, "Loading listing page");
        let outcome = self.catalog.fetch_page(page, page_size).await;

        let mut pager = self.pager.write().await;
        if pager.resolve(ticket, outcome.clone()) {
            Ok(Resolution::Applied(outcome))
        } else {
            Ok(Resolution::Discarded)
        }
    }

    /// Current state of the listing
    pub async fn state(&self) -> RequestState<CatalogSnapshot> {
        self.pager.read().await.state().clone()
    }

    pub async fn page(&self) -> u32 {
        self.pager.read().await.page()
    }

    pub async fn can_go_next(&self) -> bool {
        self.pager.read().await.can_go_next()
    }

    pub async fn can_go_previous(&self) -> bool {
        self.pager.read().await.can_go_previous()
    }

    /// The page is gone; outcomes still in flight will be dropped
    pub async fn close(&self) {
        self.pager.write().await.close();
    }
}

/// The search box over a flat snapshot of the top coins
#[derive(Clone)]
pub struct SearchPage {
    catalog: CatalogCache,
    snapshot_size: u32,
    options: SearchOptions,
    tracker: Arc<RwLock<RequestTracker<SearchIndex>>>,
}

impl SearchPage {
    pub fn new(catalog: CatalogCache, snapshot_size: u32, options: SearchOptions) -> Self {
        Self {
            catalog,
            snapshot_size,
            options,
            tracker: Arc::new(RwLock::new(RequestTracker::new())),
        }
    }

    /// Fetches the snapshot and rebuilds the index from scratch
    pub async fn load(&self) -> Resolution<usize> {
        let ticket = {
            let mut tracker = self.tracker.write().await;
            if tracker.is_closed() {
                return Resolution::Discarded;
            }
            tracker.begin()
        };

        let outcome = self
            .catalog
            .fetch_page(1, self.snapshot_size)
            .await
            .map(|snapshot| SearchIndex::from_snapshot(&snapshot, self.options));
        let indexed = outcome.as_ref().map(SearchIndex::len).map_err(CatalogError::clone);

        if self.tracker.write().await.resolve(ticket, outcome) {
            if let Ok(count) = &indexed {
                tracing::debug!(count, "Search index rebuilt");
            }
            Resolution::Applied(indexed)
        } else {
            Resolution::Discarded
        }
    }

    /// Matches `text` against the loaded snapshot, best match first
    ///
    /// Empty until a load has succeeded, and empty for a blank query.
    pub async fn search(&self, text: &str) -> Vec<MarketEntry> {
        match self.tracker.read().await.state() {
            RequestState::Ready(index) => index.query(text),
            _ => Vec::new(),
        }
    }

    pub async fn is_loading(&self) -> bool {
        self.tracker.read().await.state().is_loading()
    }

    /// The load error, if the last load failed
    pub async fn error(&self) -> Option<CatalogError> {
        self.tracker.read().await.state().error().cloned()
    }

    pub async fn close(&self) {
        self.tracker.write().await.close();
    }
}

/// A single coin's detail view
#[derive(Clone)]
pub struct DetailPage {
    catalog: CatalogCache,
    tracker: Arc<RwLock<RequestTracker<CoinDetail>>>,
}

impl DetailPage {
    pub fn new(catalog: CatalogCache) -> Self {
        Self {
            catalog,
            tracker: Arc::new(RwLock::new(RequestTracker::new())),
        }
    }

    /// Loads the detail and price history for `id`
    ///
    /// Switching to another id while loading supersedes the first request.
    pub async fn get_detail(&self, id: &str) -> Resolution<CoinDetail> {
        let ticket = {
            let mut tracker = self.tracker.write().await;
            if tracker.is_closed() {
                return Resolution::Discarded;
            }
            tracker.begin()
        };

        let outcome = self.catalog.fetch_one(id).await;

        if self.tracker.write().await.resolve(ticket, outcome.clone()) {
            Resolution::Applied(outcome)
        } else {
            Resolution::Discarded
        }
    }

    pub async fn state(&self) -> RequestState<CoinDetail> {
        self.tracker.read().await.state().clone()
    }

    pub async fn close(&self) {
        self.tracker.write().await.close();
    }
}
