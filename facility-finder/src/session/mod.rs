//! Search orchestration.
//!
//! [`SearchPipeline`] composes fetch, normalize, filter and enrich for one
//! query. [`SearchSession`] is the caller-owned state machine around it.

mod config;
mod generation;
mod pipeline;
mod state;

pub use config::{CategoryConfig, PipelineConfig, default_categories};
pub use generation::{Generation, SessionHandle};
pub use pipeline::{OriginRequest, SearchError, SearchPipeline, SearchQuery, SearchResult};
pub use state::{SearchSession, SessionState};
