//! Per-row fetch and extraction.

use tracing::{error, info};

use crate::fetch::Fetcher;
use crate::models::{EscalationPolicyRow, MetricQuery, Minutes};

/// Fetches and converts the metric for one sheet row.
///
/// Every failure stops here: the caller only sees whether a value came back.
pub struct RowProcessor {
    fetcher: Fetcher,
}

impl RowProcessor {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Minutes to first acknowledgement for `row`, or `None` when the fetch
    /// failed or the response carried no value.
    pub async fn process(&self, row: &EscalationPolicyRow, query: &MetricQuery) -> Option<Minutes> {
        let response = match self.fetcher.fetch(query).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    "Error processing row {} ({}, ID: {}): {:#}",
                    row.row,
                    row.name,
                    row.id,
                    anyhow::Error::new(e)
                );
                return None;
            }
        };

        let Some(record) = response.first_record() else {
            info!("  No data found in response or empty data array");
            return None;
        };

        let seconds = record.mean_seconds_to_first_ack?;
        info!("  Found mean_seconds_to_first_ack: {}", seconds);

        let minutes = Minutes::from_seconds(seconds);
        if minutes.is_none() {
            error!("  Ignoring invalid mean_seconds_to_first_ack: {}", seconds);
        }
        minutes
    }
}
