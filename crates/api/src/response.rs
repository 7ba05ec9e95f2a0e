//! Success envelopes shared by the resource handlers.

use serde::Serialize;

/// `{"status": "success", "results"?: n, "data": {...}}`
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            results: None,
            data,
        }
    }

    /// Envelope for collection responses, carrying the number of items returned.
    pub fn with_results(results: usize, data: T) -> Self {
        Self {
            status: "success",
            results: Some(results),
            data,
        }
    }
}
