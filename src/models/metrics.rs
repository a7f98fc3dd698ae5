//! Analytics request and response shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::MonthWindow;
use crate::calculate::seconds_to_minutes;

/// Filters sent to the incident analytics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFilters {
    pub escalation_policy_ids: Vec<String>,
    pub created_at_start: String,
    pub created_at_end: String,
}

/// Request body for one aggregate metrics query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub filters: MetricFilters,
}

impl MetricQuery {
    /// Query covering a single escalation policy over `window`.
    pub fn for_policy(policy_id: &str, window: &MonthWindow) -> Self {
        Self {
            filters: MetricFilters {
                escalation_policy_ids: vec![policy_id.to_string()],
                created_at_start: window.start_param(),
                created_at_end: window.end_param(),
            },
        }
    }
}

/// Aggregate values for one result record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricResult {
    pub mean_seconds_to_first_ack: Option<f64>,
    pub total_incident_count: Option<u64>,
}

/// Raw JSON body returned by the analytics endpoint.
///
/// Kept untyped so that a missing or oddly shaped field means "no value"
/// rather than a decode failure.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsResponse(pub Value);

impl MetricsResponse {
    pub fn new(body: Value) -> Self {
        Self(body)
    }

    /// First record of the `data` array, if any.
    pub fn first_record(&self) -> Option<MetricResult> {
        let record = self.0.get("data")?.as_array()?.first()?;
        Some(MetricResult {
            mean_seconds_to_first_ack: record
                .get("mean_seconds_to_first_ack")
                .and_then(Value::as_f64),
            total_incident_count: record.get("total_incident_count").and_then(Value::as_u64),
        })
    }
}

/// A duration in minutes, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Minutes(f64);

impl Minutes {
    /// Convert a seconds value. Negative or non-finite input has no minutes value.
    pub fn from_seconds(seconds: f64) -> Option<Self> {
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }
        seconds_to_minutes(Some(seconds)).map(Self)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Minutes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Month;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_query_wire_shape() {
        let window = MonthWindow::resolve(Month::Mar, 2025).unwrap();
        let query = MetricQuery::for_policy("PABC123", &window);

        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "filters": {
                    "escalation_policy_ids": ["PABC123"],
                    "created_at_start": "2025-03-01T00:00:00.000000Z",
                    "created_at_end": "2025-03-31T23:59:59.000000Z"
                }
            })
        );
    }

    #[test]
    fn test_first_record() {
        let response = MetricsResponse::new(json!({
            "data": [
                {"mean_seconds_to_first_ack": 345.5, "total_incident_count": 12},
                {"mean_seconds_to_first_ack": 1.0, "total_incident_count": 1}
            ]
        }));

        assert_eq!(
            response.first_record(),
            Some(MetricResult {
                mean_seconds_to_first_ack: Some(345.5),
                total_incident_count: Some(12),
            })
        );
    }

    #[test]
    fn test_first_record_missing_or_empty_data() {
        assert_eq!(MetricsResponse::new(json!({})).first_record(), None);
        assert_eq!(MetricsResponse::new(json!({"data": []})).first_record(), None);
        assert_eq!(MetricsResponse::new(json!({"data": "nope"})).first_record(), None);
    }

    #[test]
    fn test_first_record_null_mean() {
        let response = MetricsResponse::new(json!({
            "data": [{"mean_seconds_to_first_ack": null, "total_incident_count": 0}]
        }));

        let record = response.first_record().unwrap();
        assert_eq!(record.mean_seconds_to_first_ack, None);
        assert_eq!(record.total_incident_count, Some(0));
    }

    #[test]
    fn test_minutes_from_seconds() {
        assert_eq!(Minutes::from_seconds(120.0).unwrap().value(), 2.0);
        assert_eq!(Minutes::from_seconds(0.0).unwrap().value(), 0.0);
        assert_eq!(Minutes::from_seconds(-5.0), None);
        assert_eq!(Minutes::from_seconds(f64::NAN), None);
        assert_eq!(Minutes::from_seconds(90.0).unwrap().to_string(), "1.50");
    }
}
