//! Web layer for the facility finder.
//!
//! JSON endpoints for listing categories and searching nearby facilities.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, LivePipeline};
