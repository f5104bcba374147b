// Provider trait for point time-series data
use crate::domain::geometry::Coordinate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Fetch the hourly samples at `point` between `start` and `end`.
    ///
    /// Errors are allowed here; the classification pipeline absorbs them.
    async fn fetch_series(
        &self,
        point: Coordinate,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<f64>>;
}
