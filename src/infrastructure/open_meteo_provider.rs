// Open-Meteo archive provider implementation
use crate::application::series_provider::SeriesProvider;
use crate::domain::geometry::Coordinate;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    client: reqwest::Client,
    base_url: String,
    hourly_variable: String,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    hourly: Option<HashMap<String, serde_json::Value>>,
}

impl OpenMeteoProvider {
    pub fn new(base_url: String, hourly_variable: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            hourly_variable,
        }
    }

    fn build_archive_url(&self, point: Coordinate, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        format!(
            "{}/v1/archive?latitude={}&longitude={}&start_date={}&end_date={}&hourly={}",
            self.base_url,
            point.lat,
            point.lng,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            urlencoding::encode(&self.hourly_variable)
        )
    }

    /// Reject non-2xx statuses and undecodable bodies, then extract the series.
    async fn read_series(&self, response: reqwest::Response) -> Result<Vec<f64>> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Open-Meteo request failed with status {}: {}", status, body);
        }

        let data = response
            .json::<ArchiveResponse>()
            .await
            .context("Failed to parse Open-Meteo response")?;

        Ok(self.extract_series(data))
    }

    /// Pull the configured variable out of the `hourly` block.
    ///
    /// A missing block or variable is an empty series; `null` gaps are skipped.
    fn extract_series(&self, response: ArchiveResponse) -> Vec<f64> {
        let Some(values) = response
            .hourly
            .as_ref()
            .and_then(|hourly| hourly.get(&self.hourly_variable))
            .and_then(|v| v.as_array())
        else {
            tracing::debug!(variable = %self.hourly_variable, "Archive response has no hourly series");
            return Vec::new();
        };

        values.iter().filter_map(|v| v.as_f64()).collect()
    }
}

#[async_trait]
impl SeriesProvider for OpenMeteoProvider {
    async fn fetch_series(
        &self,
        point: Coordinate,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<f64>> {
        let url = self.build_archive_url(point, start, end);
        tracing::debug!("Fetching archive series: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to Open-Meteo")?;

        let samples = self.read_series(response).await?;
        tracing::debug!(samples = samples.len(), "Fetched archive series");
        Ok(samples)
    }
}
