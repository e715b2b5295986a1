//! Paginated time-range retrieval
//!
//! The exchange's history endpoints (candlesticks, order history) cap each
//! response at a fixed number of records. [`RangeWalker`] retrieves every
//! record in a requested time window by repeatedly invoking an injected
//! fetch function over shrinking sub-windows, deduplicating across page
//! boundaries and merging the pages into one chronologically ordered
//! result.
//!
//! A page that comes back exactly at the cap is ambiguous: the window may
//! hold more records than one page can carry. The walker never trusts such
//! a page. Closed sub-windows are bisected (both halves are re-fetched,
//! overlapping at the midpoint, with dedup absorbing the overlap) and
//! open-ended sub-windows advance the frontier past the oldest record seen.
//! Window edges are inclusive on both ends.
//!
//! Fetches are issued strictly sequentially; each sub-window depends on the
//! previous page's contents. Rate limiting and retries belong to the fetch
//! function, not the walker.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Minimal contract a record must satisfy for the walker: a comparable
/// timestamp for ordering and a stable identity for deduplication.
pub trait PageRecord {
    fn timestamp_ms(&self) -> i64;
    fn record_id(&self) -> String;
}

/// Whether the endpoint pages oldest-first or newest-first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Time range to retrieve, in Unix milliseconds, inclusive on both ends
///
/// A `None` start means "walk backward until the endpoint runs out of
/// history" and is only valid for backward walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<i64>,
    pub end: i64,
}

impl TimeWindow {
    /// Window bounded on both ends
    pub fn closed(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end,
        }
    }

    /// Open-ended window covering all history up to `end`
    pub fn until(end: i64) -> Self {
        Self { start: None, end }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(start) => write!(f, "[{}, {}]", start, self.end),
            None => write!(f, "[.., {}]", self.end),
        }
    }
}

/// Walker tuning parameters
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Endpoint-documented cap on records per page
    pub max_page_size: usize,
    /// Paging order of the underlying endpoint
    pub direction: Direction,
    /// Hard ceiling on fetch calls per walk; exceeding it fails the walk
    /// with [`Error::PaginationSafety`]
    pub max_fetches: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            direction: Direction::Backward,
            max_fetches: 10_000,
        }
    }
}

impl WalkerConfig {
    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_max_fetches(mut self, max_fetches: usize) -> Self {
        self.max_fetches = max_fetches;
        self
    }
}

/// A failed walk, carrying whatever was retrieved before the failure
///
/// Partial results are sorted and deduplicated, so long-running downloads
/// can be persisted and resumed from the last successful frontier.
#[derive(Debug)]
pub struct WalkError<R> {
    pub error: Error,
    pub partial: Vec<R>,
}

impl<R> WalkError<R> {
    pub fn into_parts(self) -> (Error, Vec<R>) {
        (self.error, self.partial)
    }
}

impl<R> fmt::Display for WalkError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "walk aborted after collecting {} records: {}",
            self.partial.len(),
            self.error
        )
    }
}

impl<R: fmt::Debug> std::error::Error for WalkError<R> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Retrieves a complete record set from a paginated, capped endpoint
#[derive(Debug, Clone)]
pub struct RangeWalker {
    config: WalkerConfig,
}

impl RangeWalker {
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    /// Walk `window` and return every record it contains, oldest first
    ///
    /// `fetch` performs one call for a sub-window and returns its page,
    /// newest-first or oldest-first according to the configured direction.
    /// Pages may overlap at window edges; records are deduplicated by
    /// [`PageRecord::record_id`].
    pub async fn collect<R, F, Fut>(
        &self,
        window: TimeWindow,
        fetch: F,
    ) -> std::result::Result<Vec<R>, WalkError<R>>
    where
        R: PageRecord,
        F: Fn(TimeWindow) -> Fut,
        Fut: Future<Output = Result<Vec<R>>>,
    {
        if self.config.direction == Direction::Forward && window.start.is_none() {
            return Err(WalkError {
                error: Error::Config(
                    "forward walks require a bounded window start".to_string(),
                ),
                partial: Vec::new(),
            });
        }
        if window.start.is_some_and(|start| start > window.end) {
            return Ok(Vec::new());
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut records: Vec<R> = Vec::new();
        let mut pending = vec![window];
        let mut fetches = 0usize;

        while let Some(win) = pending.pop() {
            if fetches >= self.config.max_fetches {
                warn!(
                    "aborting walk of {} after {} fetches; endpoint may have changed behavior",
                    window, fetches
                );
                return Err(abort(Error::PaginationSafety { fetches }, records));
            }
            fetches += 1;

            let page = match fetch(win).await {
                Ok(page) => page,
                Err(error) => return Err(abort(error, records)),
            };
            if page.is_empty() {
                debug!("window {} exhausted", win);
                continue;
            }

            // min/max are safe: the page is non-empty
            let oldest = page.iter().map(|r| r.timestamp_ms()).min().unwrap();
            let newest = page.iter().map(|r| r.timestamp_ms()).max().unwrap();
            let capped = page.len() >= self.config.max_page_size;

            let before = records.len();
            for record in page {
                if seen.insert(record.record_id()) {
                    records.push(record);
                }
            }
            debug!(
                "window {}: {} new records ({} total), span {}..{}",
                win,
                records.len() - before,
                records.len(),
                oldest,
                newest
            );

            if capped {
                self.narrow(win, oldest, &mut pending);
            } else {
                self.advance(win, oldest, newest, &mut pending);
            }
        }

        records.sort_by_key(|r| r.timestamp_ms());
        Ok(records)
    }

    /// A page at the cap cannot be assumed to cover its window. Split the
    /// window so no sub-range is silently dropped.
    fn narrow(&self, win: TimeWindow, oldest: i64, pending: &mut Vec<TimeWindow>) {
        match win.start {
            Some(start) => {
                if win.end - start <= 1 {
                    // cannot shrink further; the endpoint returned all it will
                    warn!("window {} still at page cap but too small to split", win);
                    return;
                }
                let mid = start + (win.end - start) / 2;
                pending.push(TimeWindow::closed(start, mid));
                pending.push(TimeWindow::closed(mid, win.end));
            }
            None => {
                let next_end = oldest - 1;
                if next_end < win.end {
                    pending.push(TimeWindow::until(next_end));
                }
            }
        }
    }

    /// A partial page: continue past its frontier unless it already reached
    /// the outer window boundary.
    fn advance(&self, win: TimeWindow, oldest: i64, newest: i64, pending: &mut Vec<TimeWindow>) {
        match self.config.direction {
            Direction::Backward => {
                if win.start.is_some_and(|start| oldest <= start) {
                    return;
                }
                let next_end = oldest - 1;
                if next_end < win.end && win.start.is_none_or(|start| next_end >= start) {
                    pending.push(TimeWindow {
                        start: win.start,
                        end: next_end,
                    });
                }
            }
            Direction::Forward => {
                if newest >= win.end {
                    return;
                }
                pending.push(TimeWindow::closed(newest + 1, win.end));
            }
        }
    }
}

fn abort<R: PageRecord>(error: Error, mut partial: Vec<R>) -> WalkError<R> {
    partial.sort_by_key(|r| r.timestamp_ms());
    WalkError { error, partial }
}
