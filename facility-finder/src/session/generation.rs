//! Query generations.
//!
//! A session's epoch counter is bumped whenever its origin or category
//! changes. Work started under an older epoch checks its [`Generation`] before
//! writing results and discards them once it is stale.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared epoch counter. Clones observe and bump the same counter, so another
/// task can cancel a running search.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    epoch: Arc<AtomicU64>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersede every outstanding generation. Returns the new epoch.
    pub fn invalidate(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Issue a generation for work starting now.
    pub fn generation(&self) -> Generation {
        Generation {
            epoch: Some(Arc::clone(&self.epoch)),
            issued: self.epoch(),
        }
    }
}

/// The epoch a piece of work was started under.
#[derive(Debug, Clone)]
pub struct Generation {
    epoch: Option<Arc<AtomicU64>>,
    issued: u64,
}

impl Generation {
    /// A generation that is never superseded, for one-off searches outside a
    /// session.
    pub fn detached() -> Self {
        Self {
            epoch: None,
            issued: 0,
        }
    }

    /// Whether no newer query has started since this one was issued.
    pub fn is_current(&self) -> bool {
        match &self.epoch {
            Some(epoch) => epoch.load(Ordering::SeqCst) == self.issued,
            None => true,
        }
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }
}
