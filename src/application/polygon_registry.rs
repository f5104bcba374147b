// Polygon registry - live polygons, shared settings and reclassification passes
use crate::application::classification_service::ClassificationService;
use crate::domain::error::ClassificationError;
use crate::domain::geometry::Polygon;
use crate::domain::rule::{ColorToken, Rule, RuleEdit, RuleIndexError, RuleSet};
use crate::domain::time_window::TimeWindow;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PolygonId(u64);

impl PolygonId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolygonRecord {
    pub id: PolygonId,
    pub polygon: Polygon,
    /// `None` until the first classification lands.
    pub color: Option<ColorToken>,
}

/// Settings shared by every polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub time_window: TimeWindow,
    pub rules: RuleSet,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_window: TimeWindow::full(),
            rules: RuleSet::default(),
        }
    }
}

#[derive(Clone)]
pub struct PolygonRegistry {
    classifier: ClassificationService,
    polygons: Arc<RwLock<BTreeMap<PolygonId, PolygonRecord>>>,
    settings: Arc<RwLock<Settings>>,
    next_id: Arc<AtomicU64>,
    pass_counter: Arc<AtomicU64>,
}

impl PolygonRegistry {
    pub fn new(classifier: ClassificationService, settings: Settings) -> Self {
        Self {
            classifier,
            polygons: Arc::new(RwLock::new(BTreeMap::new())),
            settings: Arc::new(RwLock::new(settings)),
            next_id: Arc::new(AtomicU64::new(1)),
            pass_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Validate, classify and only then insert a newly drawn polygon.
    pub async fn create(&self, polygon: Polygon) -> Result<PolygonRecord, ClassificationError> {
        let settings = self.settings().await;
        let now = Utc::now();

        let color = self
            .classifier
            .validate_and_classify(&polygon, settings.time_window, settings.rules.rules(), now)
            .await
            .inspect_err(|e| tracing::info!(error = %e, "Rejected polygon"))?;

        let id = PolygonId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = PolygonRecord {
            id,
            polygon,
            color: Some(color),
        };
        self.polygons.write().await.insert(id, record.clone());

        tracing::info!(%id, color = ?record.color, "Created polygon");
        Ok(record)
    }

    pub async fn get(&self, id: PolygonId) -> Option<PolygonRecord> {
        self.polygons.read().await.get(&id).cloned()
    }

    pub async fn list(&self) -> Vec<PolygonRecord> {
        self.polygons.read().await.values().cloned().collect()
    }

    pub async fn remove(&self, id: PolygonId) -> Option<PolygonRecord> {
        let removed = self.polygons.write().await.remove(&id);
        if removed.is_some() {
            tracing::info!(%id, "Removed polygon");
        }
        removed
    }

    pub async fn set_time_window(&self, window: TimeWindow) -> Vec<JoinHandle<()>> {
        self.settings.write().await.time_window = window;
        tracing::info!(start = window.start(), end = window.end(), "Time window changed");
        self.reclassify_all().await
    }

    pub async fn set_rules(&self, rules: Vec<Rule>) -> Vec<JoinHandle<()>> {
        let count = {
            let mut settings = self.settings.write().await;
            settings.rules.replace(rules);
            settings.rules.len()
        };
        tracing::info!(rules = count, "Rules replaced");
        self.reclassify_all().await
    }

    pub async fn add_default_rule(&self) -> Vec<JoinHandle<()>> {
        self.settings.write().await.rules.push_default();
        self.reclassify_all().await
    }

    pub async fn update_rule(
        &self,
        index: usize,
        edit: RuleEdit,
    ) -> Result<Vec<JoinHandle<()>>, RuleIndexError> {
        self.settings.write().await.rules.update(index, edit)?;
        Ok(self.reclassify_all().await)
    }

    pub async fn remove_rule(&self, index: usize) -> Result<Vec<JoinHandle<()>>, RuleIndexError> {
        self.settings.write().await.rules.remove(index)?;
        Ok(self.reclassify_all().await)
    }

    /// Spawn one classification task per live polygon.
    ///
    /// `now` and the settings are captured once for the whole pass. Each task
    /// writes only its own record; records removed mid-flight are skipped.
    /// Passes are not cancelled, so a slow task from an older pass can still
    /// overwrite a newer color.
    pub async fn reclassify_all(&self) -> Vec<JoinHandle<()>> {
        let pass = self.pass_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let settings = Arc::new(self.settings().await);
        let now = Utc::now();

        let snapshot: Vec<(PolygonId, Polygon)> = self
            .polygons
            .read()
            .await
            .values()
            .map(|r| (r.id, r.polygon.clone()))
            .collect();

        tracing::debug!(pass, polygons = snapshot.len(), "Starting reclassification pass");

        snapshot
            .into_iter()
            .map(|(id, polygon)| {
                let classifier = self.classifier.clone();
                let polygons = self.polygons.clone();
                let settings = settings.clone();

                tokio::spawn(async move {
                    let color = classifier
                        .classify_polygon(&polygon, settings.time_window, settings.rules.rules(), now)
                        .await;

                    match polygons.write().await.get_mut(&id) {
                        Some(record) => {
                            tracing::debug!(pass, %id, %color, "Recolored polygon");
                            record.color = Some(color);
                        }
                        None => {
                            tracing::debug!(pass, %id, "Polygon removed before recolor");
                        }
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::classification_service::tests::{square, FixedProvider};
    use crate::application::series_provider::SeriesProvider;
    use crate::domain::geometry::Coordinate;
    use crate::domain::rule::Operator;
    use async_trait::async_trait;
    use chrono::DateTime;
    use futures::future::join_all;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn registry(samples: Vec<f64>) -> PolygonRegistry {
        let provider = Arc::new(FixedProvider::new(samples));
        PolygonRegistry::new(ClassificationService::new(provider), Settings::default())
    }

    async fn wait(handles: Vec<JoinHandle<()>>) {
        for result in join_all(handles).await {
            result.unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_colors() {
        let registry = registry(vec![5.0]);

        let first = registry.create(square()).await.unwrap();
        let second = registry.create(square()).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.color, Some(ColorToken::new("#ff0000")));
        assert_eq!(registry.list().await.len(), 2);
        assert_eq!(registry.get(first.id).await, Some(first));
    }

    #[tokio::test]
    async fn test_rejected_polygon_is_not_inserted() {
        let registry = registry(vec![5.0]);
        let too_many = Polygon::new(vec![Coordinate::new(0.0, 0.0); 13]);

        let err = registry.create(too_many).await.unwrap_err();
        assert_eq!(err, ClassificationError::PointCount { count: 13 });
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_rule_change_recolors_every_polygon() {
        let registry = registry(vec![30.0]);
        let a = registry.create(square()).await.unwrap();
        let b = registry.create(square()).await.unwrap();
        assert_eq!(a.color, Some(ColorToken::new("#0000ff")));

        let handles = registry
            .set_rules(vec![Rule::new(Operator::Gt, "20", ColorToken::new("hot"))])
            .await;
        assert_eq!(handles.len(), 2);
        wait(handles).await;

        for id in [a.id, b.id] {
            assert_eq!(registry.get(id).await.unwrap().color, Some(ColorToken::new("hot")));
        }
    }

    #[tokio::test]
    async fn test_time_window_change_uses_new_window() {
        let provider = Arc::new(FixedProvider::new(vec![30.0]));
        let registry = PolygonRegistry::new(
            ClassificationService::new(provider.clone()),
            Settings::default(),
        );
        registry.create(square()).await.unwrap();

        let window = TimeWindow::new(360, 360).unwrap();
        wait(registry.set_time_window(window).await).await;

        assert_eq!(registry.settings().await.time_window, window);
        let requests = provider.requests.lock().unwrap();
        let (_, start, end) = requests[1];
        assert_eq!(start, end);
    }

    #[tokio::test]
    async fn test_rule_editing_operations() {
        let registry = registry(vec![30.0]);
        let record = registry.create(square()).await.unwrap();

        wait(registry.remove_rule(2).await.unwrap()).await;
        // 30 no longer matches `<10` or `<25`
        assert_eq!(
            registry.get(record.id).await.unwrap().color,
            Some(ColorToken::default_color())
        );

        wait(registry.add_default_rule().await).await;
        let edit = RuleEdit {
            operator: Some(Operator::Ge),
            value: Some("30".to_string()),
            color: Some(ColorToken::new("#123456")),
        };
        wait(registry.update_rule(2, edit).await.unwrap()).await;
        assert_eq!(
            registry.get(record.id).await.unwrap().color,
            Some(ColorToken::new("#123456"))
        );

        assert!(registry.remove_rule(7).await.is_err());
        assert_eq!(registry.settings().await.rules.len(), 3);
    }

    #[tokio::test]
    async fn test_removed_polygon_is_not_recolored() {
        let registry = registry(vec![30.0]);
        let record = registry.create(square()).await.unwrap();
        assert!(registry.remove(record.id).await.is_some());
        assert!(registry.remove(record.id).await.is_none());

        let handles = registry.reclassify_all().await;
        assert!(handles.is_empty());
        assert!(registry.get(record.id).await.is_none());
    }

    /// Blocks fetches for polygons whose centroid latitude is above 50
    /// until released; everything else answers immediately.
    struct GatedProvider {
        gate: Notify,
    }

    #[async_trait]
    impl SeriesProvider for GatedProvider {
        async fn fetch_series(
            &self,
            point: Coordinate,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> anyhow::Result<Vec<f64>> {
            if point.lat > 50.0 {
                self.gate.notified().await;
                anyhow::bail!("timed out upstream");
            }
            Ok(vec![30.0])
        }
    }

    #[tokio::test]
    async fn test_slow_polygon_does_not_block_siblings() {
        let provider = Arc::new(GatedProvider { gate: Notify::new() });
        let registry = PolygonRegistry::new(
            ClassificationService::new(provider.clone()),
            Settings::default(),
        );
        let fast = registry.create(square()).await.unwrap();

        // Insert the slow polygon directly so creation does not wait on the gate.
        let slow_polygon = Polygon::new(vec![
            Coordinate::new(60.0, 0.0),
            Coordinate::new(60.0, 1.0),
            Coordinate::new(61.0, 1.0),
        ]);
        let slow_id = PolygonId::new(99);
        registry.polygons.write().await.insert(
            slow_id,
            PolygonRecord {
                id: slow_id,
                polygon: slow_polygon,
                color: None,
            },
        );

        let mut handles = registry
            .set_rules(vec![Rule::new(Operator::Gt, "20", ColorToken::new("hot"))])
            .await;
        assert_eq!(handles.len(), 2);

        // Records are ordered by id: the fast polygon first.
        let slow_handle = handles.pop().unwrap();
        wait(handles).await;
        assert_eq!(registry.get(fast.id).await.unwrap().color, Some(ColorToken::new("hot")));
        assert_eq!(registry.get(slow_id).await.unwrap().color, None);

        provider.gate.notify_one();
        slow_handle.await.unwrap();
        // Failed fetch: mean 0 matches nothing.
        assert_eq!(
            registry.get(slow_id).await.unwrap().color,
            Some(ColorToken::default_color())
        );
    }

    #[tokio::test]
    async fn test_pass_shares_one_instant() {
        let provider = Arc::new(FixedProvider::new(vec![30.0]));
        let registry = PolygonRegistry::new(
            ClassificationService::new(provider.clone()),
            Settings::default(),
        );
        for _ in 0..5 {
            registry.create(square()).await.unwrap();
        }
        provider.requests.lock().unwrap().clear();

        wait(registry.reclassify_all().await).await;

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 5);
        let (_, first_start, first_end) = requests[0];
        for &(_, start, end) in requests.iter() {
            assert_eq!((start, end), (first_start, first_end));
        }
    }

    /// Holds the first fetch until released; later fetches answer at once.
    struct FirstCallGate {
        calls: AtomicUsize,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl SeriesProvider for FirstCallGate {
        async fn fetch_series(
            &self,
            _point: Coordinate,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> anyhow::Result<Vec<f64>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(vec![30.0])
        }
    }

    #[tokio::test]
    async fn test_in_flight_pass_keeps_its_settings_snapshot() {
        let provider = Arc::new(FirstCallGate {
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let registry = PolygonRegistry::new(
            ClassificationService::new(provider.clone()),
            Settings::default(),
        );
        let id = PolygonId::new(1);
        registry.polygons.write().await.insert(
            id,
            PolygonRecord {
                id,
                polygon: square(),
                color: None,
            },
        );

        // Default rules color 30 as #0000ff.
        let mut old_pass = registry.reclassify_all().await;
        provider.entered.notified().await;

        wait(
            registry
                .set_rules(vec![Rule::new(Operator::Gt, "20", ColorToken::new("hot"))])
                .await,
        )
        .await;
        assert_eq!(registry.get(id).await.unwrap().color, Some(ColorToken::new("hot")));

        // The older pass finishes last and still applies the rules it captured.
        provider.release.notify_one();
        old_pass.pop().unwrap().await.unwrap();
        assert_eq!(
            registry.get(id).await.unwrap().color,
            Some(ColorToken::new("#0000ff"))
        );
    }
}
