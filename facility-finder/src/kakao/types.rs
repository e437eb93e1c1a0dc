//! Kakao API response types.
//!
//! Only the fields the pipeline reads are modelled. Kakao sends coordinates
//! as decimal strings in local search and numbers elsewhere, so both are
//! accepted.

use serde::{Deserialize, Deserializer};

/// Response from the local (keyword/address) search API.
#[derive(Debug, Deserialize)]
pub struct LocalSearchResponse {
    #[serde(default)]
    pub documents: Vec<LocalDocument>,
}

/// One local search match.
#[derive(Debug, Deserialize)]
pub struct LocalDocument {
    /// Longitude
    #[serde(deserialize_with = "lenient_f64")]
    pub x: f64,

    /// Latitude
    #[serde(deserialize_with = "lenient_f64")]
    pub y: f64,

    #[serde(default)]
    pub place_name: Option<String>,

    #[serde(default)]
    pub address_name: Option<String>,
}

/// Response from the mobility directions API.
#[derive(Debug, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// One route candidate.
#[derive(Debug, Deserialize)]
pub struct Route {
    /// 0 on success; other codes mean no route was found
    #[serde(default)]
    pub result_code: i32,

    #[serde(default)]
    pub result_msg: Option<String>,

    /// Absent when `result_code` is non-zero
    pub summary: Option<RouteSummary>,
}

#[derive(Debug, Deserialize)]
pub struct RouteSummary {
    /// Duration in seconds
    pub duration: f64,

    /// Distance in metres
    #[serde(default)]
    pub distance: Option<f64>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(f64),
        Str(String),
    }

    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
