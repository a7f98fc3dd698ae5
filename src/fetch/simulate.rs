//! Offline responses for dry runs.

use rand::Rng;
use serde_json::json;

use crate::models::MetricsResponse;

/// Synthesize a response shaped like the real endpoint's.
///
/// The mean falls between 2 minutes and 2 hours, the incident count between 5 and 20.
pub fn simulated_response() -> MetricsResponse {
    let mut rng = rand::thread_rng();
    let mean_seconds = rng.gen_range(120..=7200u32);
    let incident_count = rng.gen_range(5..=20u32);

    MetricsResponse::new(json!({
        "data": [{
            "mean_seconds_to_first_ack": mean_seconds,
            "total_incident_count": incident_count
        }]
    }))
}
