//! Usage metrics endpoint

use super::ApiClient;
use crate::error::ClientResult;
use crate::models::{ChartPoint, MetricsSnapshot};
use crate::transport::ApiRequest;

const METRICS_PATH: &str = "/api/speaking/metrics";

/// Client for `GET /api/speaking/metrics`
#[derive(Clone)]
pub struct MetricsClient {
    api: ApiClient,
}

impl MetricsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetch the current snapshot. Not cached; every dashboard view refetches.
    pub async fn fetch(&self, token: &str) -> ClientResult<MetricsSnapshot> {
        self.api
            .execute(ApiRequest::get(METRICS_PATH).bearer(token))
            .await
    }
}

/// Time spent per user as chart points, in server order
pub fn duration_series(snapshot: &MetricsSnapshot) -> Vec<ChartPoint> {
    snapshot
        .user_durations
        .iter()
        .map(|d| ChartPoint {
            label: d.user_id.clone(),
            value: d.total_duration,
        })
        .collect()
}
