//! Bounded paging over a registry dataset.
//!
//! Pages are read strictly in order because the registry has no cursor that
//! is safe to use in parallel and throttles bursts. Paging ends at the first
//! empty or malformed page, at the first failed request, once the advertised
//! total has been read, or at the page ceiling. Whatever was read before
//! the stop is kept.

use tracing::{debug, warn};

use crate::domain::RawRecord;

use super::client::{EndpointConfig, PageSource};

/// Why paging stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// An empty page, or the advertised total was reached.
    Exhausted,
    /// A page did not have the expected envelope.
    Malformed,
    /// The page ceiling was reached.
    PageCeiling,
    /// A page request failed (transport error, timeout, error status).
    Failed(String),
}

/// Everything read from one endpoint in one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySnapshot {
    pub records: Vec<RawRecord>,
    pub pages: usize,
    pub stop: StopReason,
}

impl RegistrySnapshot {
    /// A fetch that failed before any page succeeded.
    pub fn is_total_failure(&self) -> bool {
        self.pages == 0 && matches!(self.stop, StopReason::Failed(_))
    }
}

/// Lazy, finite sequence of pages from one endpoint.
///
/// Each call to [`next_page`](Self::next_page) issues at most one request.
/// Once it returns `None` the cursor is finished for good; create a new one to
/// read the dataset again.
pub struct PageCursor<'a, P: PageSource> {
    source: &'a P,
    endpoint: &'a EndpointConfig,
    page_size: usize,
    max_pages: usize,
    next_index: usize,
    rows_read: usize,
    stop: Option<StopReason>,
}

impl<'a, P: PageSource> PageCursor<'a, P> {
    pub fn new(
        source: &'a P,
        endpoint: &'a EndpointConfig,
        page_size: usize,
        max_pages: usize,
    ) -> Self {
        Self {
            source,
            endpoint,
            page_size: page_size.max(1),
            max_pages,
            next_index: 1,
            rows_read: 0,
            stop: None,
        }
    }

    /// Fetch the next non-empty page, or `None` when paging has stopped.
    pub async fn next_page(&mut self) -> Option<Vec<RawRecord>> {
        if self.stop.is_some() {
            return None;
        }

        if self.pages_read() >= self.max_pages {
            debug!(
                endpoint = %self.endpoint.url,
                pages = self.pages_read(),
                "page ceiling reached"
            );
            self.stop = Some(StopReason::PageCeiling);
            return None;
        }

        let index = self.next_index;
        let result = self
            .source
            .fetch_page(self.endpoint, index, self.page_size)
            .await;

        match result {
            Ok(page) if page.rows.is_empty() => {
                self.stop = Some(StopReason::Exhausted);
                None
            }
            Ok(page) => {
                self.next_index += 1;
                self.rows_read += page.rows.len();
                if page.total_count.is_some_and(|total| self.rows_read >= total) {
                    self.stop = Some(StopReason::Exhausted);
                }
                Some(page.rows)
            }
            Err(e) if e.is_shape() => {
                debug!(
                    endpoint = %self.endpoint.url,
                    page = index,
                    error = %e,
                    "malformed page, treating as end of data"
                );
                self.stop = Some(StopReason::Malformed);
                None
            }
            Err(e) => {
                warn!(
                    endpoint = %self.endpoint.url,
                    page = index,
                    timeout = e.is_timeout(),
                    error = %e,
                    "page request failed, keeping partial results"
                );
                self.stop = Some(StopReason::Failed(e.to_string()));
                None
            }
        }
    }

    /// Number of pages that returned rows.
    pub fn pages_read(&self) -> usize {
        self.next_index - 1
    }

    /// Why paging stopped, once it has.
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop.as_ref()
    }
}

/// Read every page of an endpoint until the cursor stops.
pub async fn fetch_all<P: PageSource>(
    source: &P,
    endpoint: &EndpointConfig,
    page_size: usize,
    max_pages: usize,
) -> RegistrySnapshot {
    let mut cursor = PageCursor::new(source, endpoint, page_size, max_pages);
    let mut records = Vec::new();

    while let Some(rows) = cursor.next_page().await {
        records.extend(rows);
    }

    let pages = cursor.pages_read();
    let stop = cursor.stop.take().unwrap_or(StopReason::Exhausted);

    debug!(
        endpoint = %endpoint.url,
        pages,
        records = records.len(),
        stop = ?stop,
        "registry fetch complete"
    );

    RegistrySnapshot {
        records,
        pages,
        stop,
    }
}
