// Classification service - polygon -> centroid -> window -> series -> mean -> color
use crate::application::series_provider::SeriesProvider;
use crate::domain::error::ClassificationError;
use crate::domain::geometry::{centroid, Polygon};
use crate::domain::rule::{classify, ColorToken, Rule};
use crate::domain::series::mean;
use crate::domain::time_window::TimeWindow;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct ClassificationService {
    provider: Arc<dyn SeriesProvider>,
}

impl ClassificationService {
    pub fn new(provider: Arc<dyn SeriesProvider>) -> Self {
        Self { provider }
    }

    /// Creation path: reject polygons outside the 3..=12 point range, then classify.
    pub async fn validate_and_classify(
        &self,
        polygon: &Polygon,
        window: TimeWindow,
        rules: &[Rule],
        now: DateTime<Utc>,
    ) -> Result<ColorToken, ClassificationError> {
        if !polygon.has_valid_point_count() {
            return Err(ClassificationError::PointCount {
                count: polygon.point_count(),
            });
        }
        Ok(self.classify_polygon(polygon, window, rules, now).await)
    }

    /// Steady-state path: no point count check, every failure degrades to a color.
    pub async fn classify_polygon(
        &self,
        polygon: &Polygon,
        window: TimeWindow,
        rules: &[Rule],
        now: DateTime<Utc>,
    ) -> ColorToken {
        let Some(point) = centroid(polygon) else {
            tracing::warn!("Polygon has no points, using default color");
            return ColorToken::default_color();
        };

        let (start, end) = window.resolve(now);
        let samples = match self.provider.fetch_series(point, start, end).await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(
                    lat = point.lat,
                    lng = point.lng,
                    error = %e,
                    "Series fetch failed, continuing with empty series"
                );
                Vec::new()
            }
        };

        let value = mean(&samples);
        let color = classify(value, rules);

        tracing::debug!(
            lat = point.lat,
            lng = point.lng,
            samples = samples.len(),
            value,
            color = %color,
            "Classified polygon"
        );

        color
    }
}
