//! A caller-owned search session.
//!
//! The session moves between states only on explicit actions:
//!
//! ```text
//! AwaitingOrigin --set_origin--> Idle --run--> Searching --> Ready | Failed
//!       ^                         ^                            |
//!       +------clear_origin-------+---set_origin/category------+
//! ```
//!
//! A result is held only in `Ready`. Changing origin, category or radius
//! discards it and supersedes any search still running.

use std::sync::Arc;

use tracing::debug;

use crate::domain::Origin;
use crate::lookup::{Geocoder, TravelTimeProvider};
use crate::registry::RecordSource;

use super::generation::SessionHandle;
use super::pipeline::{OriginRequest, SearchError, SearchPipeline, SearchQuery, SearchResult};

/// Where a session is.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Origin set, no search run yet.
    Idle,

    /// No origin.
    AwaitingOrigin,

    /// A search is running.
    Searching,

    /// The last search succeeded.
    Ready(Arc<SearchResult>),

    /// The last search or origin resolution failed.
    Failed(SearchError),
}

impl SessionState {
    pub fn result(&self) -> Option<&Arc<SearchResult>> {
        match self {
            SessionState::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready(_))
    }
}

/// One user's search context.
pub struct SearchSession<S, G, R> {
    pipeline: Arc<SearchPipeline<S, G, R>>,
    handle: SessionHandle,
    origin: Option<Origin>,
    category: String,
    radius_km: Option<f64>,
    state: SessionState,
}

impl<S, G, R> SearchSession<S, G, R>
where
    S: RecordSource + Sync,
    G: Geocoder + Sync,
    R: TravelTimeProvider + Sync,
{
    /// New session on the first configured category, awaiting an origin.
    pub fn new(pipeline: Arc<SearchPipeline<S, G, R>>) -> Self {
        let category = pipeline
            .config()
            .categories
            .first()
            .map(|c| c.key.clone())
            .unwrap_or_default();

        Self {
            pipeline,
            handle: SessionHandle::new(),
            origin: None,
            category,
            radius_km: None,
            state: SessionState::AwaitingOrigin,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Handle for cancelling this session's running search from another task.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn set_origin(&mut self, origin: Origin) {
        self.origin = Some(origin);
        self.transition(SessionState::Idle);
    }

    pub fn clear_origin(&mut self) {
        self.origin = None;
        self.transition(SessionState::AwaitingOrigin);
    }

    /// Switch category. Unknown keys leave the session untouched.
    pub fn set_category(&mut self, key: &str) -> Result<(), SearchError> {
        self.pipeline.category(key)?;
        if self.category != key {
            self.category = key.to_string();
            self.reset();
        }
        Ok(())
    }

    /// Override the category's default radius (`None` restores it).
    pub fn set_radius(&mut self, radius_km: Option<f64>) {
        if self.radius_km != radius_km {
            self.radius_km = radius_km;
            self.reset();
        }
    }

    /// Resolve and set the origin. On failure the session is left without an
    /// origin, in `Failed`.
    pub async fn resolve_origin(&mut self, request: OriginRequest) -> Result<Origin, SearchError> {
        match self.pipeline.resolve_origin(request).await {
            Ok(origin) => {
                self.set_origin(origin.clone());
                Ok(origin)
            }
            Err(e) => {
                self.origin = None;
                self.transition(SessionState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    /// The query the session would run now, if it has an origin.
    pub fn query(&self) -> Option<SearchQuery> {
        let origin = self.origin.clone()?;
        let radius_km = match self.radius_km {
            Some(r) => r,
            None => self.pipeline.config().category(&self.category)?.radius_km,
        };
        Some(SearchQuery::new(origin, self.category.clone(), radius_km))
    }

    /// Run the current query.
    ///
    /// A `Ready` result for the same query is returned as is. Without an
    /// origin this fails with [`SearchError::OriginNotFound`] and nothing is
    /// fetched.
    pub async fn run(&mut self) -> Result<Arc<SearchResult>, SearchError> {
        let Some(query) = self.query() else {
            let err = match &self.origin {
                None => SearchError::OriginNotFound("no origin set".to_string()),
                Some(_) => SearchError::UnknownCategory(self.category.clone()),
            };
            self.state = SessionState::Failed(err.clone());
            return Err(err);
        };

        if let SessionState::Ready(result) = &self.state
            && result.query == query
        {
            return Ok(Arc::clone(result));
        }

        let generation = self.handle.generation();
        self.state = SessionState::Searching;

        match self.pipeline.execute(&query, &generation).await {
            Ok(result) => {
                let result = Arc::new(result);
                self.state = SessionState::Ready(Arc::clone(&result));
                Ok(result)
            }
            Err(SearchError::Superseded) => {
                debug!(generation = generation.issued(), "search superseded");
                self.state = SessionState::Idle;
                Err(SearchError::Superseded)
            }
            Err(e) => {
                self.state = SessionState::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Back to `Idle`, or `AwaitingOrigin` if there is no origin.
    fn reset(&mut self) {
        let next = if self.origin.is_some() {
            SessionState::Idle
        } else {
            SessionState::AwaitingOrigin
        };
        self.transition(next);
    }

    fn transition(&mut self, next: SessionState) {
        self.handle.invalidate();
        self.state = next;
    }
}
