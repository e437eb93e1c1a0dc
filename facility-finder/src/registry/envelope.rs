//! Registry response envelope.
//!
//! A well-formed page looks like:
//!
//! ```json
//! {
//!   "Aedstus": [
//!     {"head": [{"list_total_count": 812}, {"RESULT": {"CODE": "INFO-000"}}]},
//!     {"row": [{"INSTL_PLACE": "...", "REFINE_WGS84_LAT": "37.26"}]}
//!   ]
//! }
//! ```
//!
//! The top-level key is the dataset name and differs per endpoint. When there
//! is no data the registry answers with a bare `{"RESULT": {...}}` object
//! instead, which is a shape deviation like any other.

use serde_json::Value;

use crate::domain::RawRecord;

use super::error::RegistryError;

/// The rows of one page plus the advertised total, when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageBody {
    pub rows: Vec<RawRecord>,
    pub total_count: Option<usize>,
}

/// Unwrap a page envelope.
///
/// Looks for the first top-level value that is an array of at least two
/// elements whose second element has a `row` array. Non-object rows are
/// skipped.
pub fn parse_envelope(body: &Value) -> Result<PageBody, RegistryError> {
    let Value::Object(top) = body else {
        return Err(shape("top level is not an object"));
    };

    let sections = top
        .values()
        .filter_map(Value::as_array)
        .find(|sections| {
            sections
                .get(1)
                .and_then(|s| s.get("row"))
                .is_some_and(Value::is_array)
        })
        .ok_or_else(|| shape("no dataset section with a row array"))?;

    let rows = sections[1]["row"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.as_object().cloned().map(RawRecord::from))
                .collect()
        })
        .unwrap_or_default();

    let total_count = sections
        .first()
        .and_then(|head| head.get("head"))
        .and_then(Value::as_array)
        .and_then(|items| items.iter().find_map(|i| i.get("list_total_count")))
        .and_then(Value::as_u64)
        .map(|n| n as usize);

    Ok(PageBody { rows, total_count })
}

fn shape(message: &str) -> RegistryError {
    RegistryError::Shape {
        message: message.to_string(),
    }
}
