//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::{CachedGeocoder, CachedRegistry};
use crate::kakao::KakaoClient;
use crate::session::SearchPipeline;

/// The pipeline wired to the live registry and Kakao APIs.
pub type LivePipeline = SearchPipeline<CachedRegistry, CachedGeocoder<KakaoClient>, KakaoClient>;

/// Shared application state.
///
/// Each request runs in its own session over the shared pipeline.
pub struct AppState<S = CachedRegistry, G = CachedGeocoder<KakaoClient>, R = KakaoClient> {
    /// Search pipeline and its caches
    pub pipeline: Arc<SearchPipeline<S, G, R>>,
}

impl<S, G, R> AppState<S, G, R> {
    pub fn new(pipeline: SearchPipeline<S, G, R>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

// Derived Clone would require S, G and R to be Clone
impl<S, G, R> Clone for AppState<S, G, R> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}
