//! Live map synchronization.
//!
//! Holds the last full snapshot of issues and located workers, reloads it
//! whenever either watched table changes, and publishes renderer-ready
//! scenes over a watch channel. Reloads are full replacements — change
//! events carry no payload into this layer — so overlapping or reordered
//! reloads can only produce a transiently stale view, never a corrupted
//! one. The watch channel makes delivery last-write-wins by construction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{watch, Notify};

use crate::backend::{BackendClient, RealtimeClient, Subscription};
use crate::livemap::heatmap::{self, HeatLayer};
use crate::livemap::markers::{self, IssueMarker, MarkerFilter, WorkerMarker};
use crate::livemap::staleness::Activity;
use crate::types::{Issue, IssueFilter, IssueStatus, WorkerProfile};

/// A point-in-time read of everything the map renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub issues: Vec<Issue>,
    pub workers: Vec<WorkerProfile>,
}

/// Where snapshots come from. The production source is the hosted
/// backend; tests drive the controller with a fixture.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn load(&self) -> Snapshot;
}

/// Production snapshot source. Load failures degrade to empty lists
/// inside the services layer, so the map renders empty instead of
/// crashing; "no data yet" and "backend down" look the same here by
/// design.
pub struct BackendSnapshots {
    client: Arc<BackendClient>,
}

impl BackendSnapshots {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SnapshotSource for BackendSnapshots {
    async fn load(&self) -> Snapshot {
        let issues =
            crate::services::issues::get_tasks(&self.client, &IssueFilter::default()).await;
        let workers = crate::services::workers::get_workers_with_location(&self.client).await;
        Snapshot { issues, workers }
    }
}

/// Counters for the stats overlay, computed from the unfiltered snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneStats {
    pub open_issues: usize,
    pub in_progress: usize,
    pub active_workers: usize,
}

/// One renderer-ready frame: heat layer, marker sets, stats.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapScene {
    pub generated_at: DateTime<Utc>,
    pub filter: MarkerFilter,
    pub heat: HeatLayer,
    pub issues: Vec<IssueMarker>,
    pub workers: Vec<WorkerMarker>,
    pub stats: SceneStats,
}

impl MapScene {
    fn empty() -> Self {
        Self {
            generated_at: Utc::now(),
            filter: MarkerFilter::All,
            heat: HeatLayer::new(Vec::new()),
            issues: Vec::new(),
            workers: Vec::new(),
            stats: SceneStats::default(),
        }
    }
}

/// Assemble a scene from a snapshot. Pure; the active filter narrows the
/// issue markers only — heat layer and stats always reflect the full
/// snapshot, matching what the dashboard shows alongside the map.
pub fn build_scene(snapshot: &Snapshot, filter: MarkerFilter, now: DateTime<Utc>) -> MapScene {
    let worker_names: HashMap<String, String> = snapshot
        .workers
        .iter()
        .map(|w| (w.id.clone(), w.full_name.clone()))
        .collect();

    let workers = markers::worker_markers(&snapshot.workers, now);
    let stats = SceneStats {
        open_issues: snapshot
            .issues
            .iter()
            .filter(|i| i.status == IssueStatus::Pending)
            .count(),
        in_progress: snapshot
            .issues
            .iter()
            .filter(|i| {
                matches!(i.status, IssueStatus::Assigned | IssueStatus::InProgress)
            })
            .count(),
        active_workers: workers
            .iter()
            .filter(|w| w.activity == Activity::Active)
            .count(),
    };

    MapScene {
        generated_at: now,
        filter,
        heat: HeatLayer::new(heatmap::heat_points(&snapshot.issues)),
        issues: markers::issue_markers(&snapshot.issues, filter, &worker_names),
        workers,
        stats,
    }
}

struct Inner {
    source: Arc<dyn SnapshotSource>,
    snapshot: RwLock<Snapshot>,
    filter: RwLock<MarkerFilter>,
    scene_tx: watch::Sender<MapScene>,
    reload: Notify,
}

impl Inner {
    async fn refresh(&self) {
        let snapshot = self.source.load().await;
        log::debug!(
            "Live map: snapshot loaded ({} issues, {} workers)",
            snapshot.issues.len(),
            snapshot.workers.len()
        );
        *self.snapshot.write() = snapshot.clone();
        self.publish(&snapshot);
    }

    fn publish(&self, snapshot: &Snapshot) {
        let filter = *self.filter.read();
        let scene = build_scene(snapshot, filter, Utc::now());
        let _ = self.scene_tx.send(scene);
    }
}

/// The live map session. Owns the reload task and the change-feed
/// subscriptions; dropping it releases both.
pub struct LiveMap {
    inner: Arc<Inner>,
    scene_rx: watch::Receiver<MapScene>,
    subscriptions: Vec<Subscription>,
    task: tokio::task::JoinHandle<()>,
}

impl LiveMap {
    /// Load the initial snapshot and spawn the reload loop. Change-feed
    /// wiring is separate (`watch_changes`) so headless and test callers
    /// can drive reloads themselves.
    pub async fn start(source: Arc<dyn SnapshotSource>) -> Self {
        let (scene_tx, scene_rx) = watch::channel(MapScene::empty());
        let inner = Arc::new(Inner {
            source,
            snapshot: RwLock::new(Snapshot::default()),
            filter: RwLock::new(MarkerFilter::All),
            scene_tx,
            reload: Notify::new(),
        });

        inner.refresh().await;

        let task = tokio::spawn({
            let inner = inner.clone();
            async move {
                loop {
                    inner.reload.notified().await;
                    inner.refresh().await;
                }
            }
        });

        Self {
            inner,
            scene_rx,
            subscriptions: Vec::new(),
            task,
        }
    }

    /// Subscribe to the watched tables. Any insert/update/delete on
    /// either triggers a full snapshot reload; bursts coalesce into one
    /// pending reload.
    pub fn watch_changes(&mut self, realtime: &RealtimeClient) {
        for table in ["tasks", "profiles"] {
            let inner = self.inner.clone();
            self.subscriptions.push(realtime.subscribe(table, move |_event| {
                inner.reload.notify_one();
            }));
        }
        log::info!("Live map: watching tasks and profiles for changes");
    }

    /// Queue a snapshot reload (what a change event does).
    pub fn schedule_reload(&self) {
        self.inner.reload.notify_one();
    }

    /// Receiver for rendered scenes. Always holds the latest frame.
    pub fn scenes(&self) -> watch::Receiver<MapScene> {
        self.scene_rx.clone()
    }

    /// The latest frame.
    pub fn scene(&self) -> MapScene {
        self.scene_rx.borrow().clone()
    }

    pub fn filter(&self) -> MarkerFilter {
        *self.inner.filter.read()
    }

    /// Change the marker filter and republish from the cached snapshot —
    /// a filter flip never needs a backend round trip.
    pub fn set_filter(&self, filter: MarkerFilter) {
        *self.inner.filter.write() = filter;
        let snapshot = self.inner.snapshot.read().clone();
        self.inner.publish(&snapshot);
    }
}

impl Drop for LiveMap {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::types::{ApprovalStatus, Priority, Role};

    fn issue(id: &str, priority: Priority, status: IssueStatus, coords: Option<(f64, f64)>) -> Issue {
        let now = Utc::now();
        Issue {
            id: id.to_string(),
            created_at: now,
            updated_at: now,
            title: format!("issue {}", id),
            description: String::new(),
            category: "water".into(),
            priority,
            status,
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            address: String::new(),
            citizen_id: None,
            citizen_name: "citizen".into(),
            citizen_phone: None,
            assigned_worker_id: None,
            assigned_at: None,
            started_at: None,
            completed_at: None,
            verified_at: None,
            completion_notes: None,
            photos: None,
            urgency_score: None,
        }
    }

    fn worker(id: &str, minutes_ago: i64) -> WorkerProfile {
        let now = Utc::now();
        WorkerProfile {
            id: id.to_string(),
            created_at: now,
            updated_at: now - ChronoDuration::minutes(minutes_ago),
            full_name: format!("worker {}", id),
            username: None,
            email: None,
            phone: None,
            role: Role::Worker,
            department: None,
            speciality: None,
            approval_status: Some(ApprovalStatus::Approved),
            current_latitude: Some(28.61),
            current_longitude: Some(77.21),
            avatar_url: None,
            approved_at: None,
            approved_by: None,
            application_id: None,
        }
    }

    fn fixture() -> Snapshot {
        Snapshot {
            issues: vec![
                issue("a", Priority::Urgent, IssueStatus::Pending, Some((28.61, 77.21))),
                issue("b", Priority::Low, IssueStatus::Assigned, Some((28.62, 77.22))),
                issue("c", Priority::Medium, IssueStatus::InProgress, Some((28.63, 77.23))),
                issue("d", Priority::High, IssueStatus::Pending, None),
            ],
            workers: vec![worker("w-1", 1), worker("w-2", 25)],
        }
    }

    struct FixtureSource {
        snapshot: RwLock<Snapshot>,
        loads: AtomicUsize,
    }

    impl FixtureSource {
        fn new(snapshot: Snapshot) -> Self {
            Self {
                snapshot: RwLock::new(snapshot),
                loads: AtomicUsize::new(0),
            }
        }

        fn set(&self, snapshot: Snapshot) {
            *self.snapshot.write() = snapshot;
        }

        fn load_count(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotSource for FixtureSource {
        async fn load(&self) -> Snapshot {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.snapshot.read().clone()
        }
    }

    #[test]
    fn test_build_scene_counts_and_layers() {
        let scene = build_scene(&fixture(), MarkerFilter::All, Utc::now());
        // Issue "d" has no coordinates: 3 heat points, 3 markers.
        assert_eq!(scene.heat.points.len(), 3);
        assert_eq!(scene.issues.len(), 3);
        assert_eq!(scene.workers.len(), 2);
        // Stats cover the full snapshot, located or not.
        assert_eq!(scene.stats.open_issues, 2);
        assert_eq!(scene.stats.in_progress, 2);
        assert_eq!(scene.stats.active_workers, 1);
    }

    #[test]
    fn test_build_scene_filter_narrows_markers_not_heat() {
        let scene = build_scene(&fixture(), MarkerFilter::Urgent, Utc::now());
        assert_eq!(scene.issues.len(), 1);
        assert_eq!(scene.issues[0].id, "a");
        assert_eq!(scene.heat.points.len(), 3);
    }

    #[test]
    fn test_build_scene_is_idempotent_over_equal_snapshots() {
        let snapshot = fixture();
        let now = Utc::now();
        let first = build_scene(&snapshot, MarkerFilter::All, now);
        let second = build_scene(&snapshot, MarkerFilter::All, now);
        assert_eq!(first.heat.points, second.heat.points);
        assert_eq!(first.issues, second.issues);
        assert_eq!(first.workers, second.workers);
        assert_eq!(first.stats, second.stats);
    }

    #[tokio::test]
    async fn test_initial_scene_available_after_start() {
        let source = Arc::new(FixtureSource::new(fixture()));
        let live = LiveMap::start(source.clone()).await;
        let scene = live.scene();
        assert_eq!(scene.issues.len(), 3);
        assert_eq!(source.load_count(), 1);
    }

    #[tokio::test]
    async fn test_reload_publishes_new_scene() {
        let source = Arc::new(FixtureSource::new(fixture()));
        let live = LiveMap::start(source.clone()).await;
        let mut scenes = live.scenes();
        scenes.borrow_and_update();

        let mut updated = fixture();
        updated
            .issues
            .push(issue("e", Priority::Urgent, IssueStatus::Pending, Some((28.7, 77.3))));
        source.set(updated);
        live.schedule_reload();

        tokio::time::timeout(Duration::from_secs(5), scenes.changed())
            .await
            .expect("scene update")
            .expect("channel open");
        assert_eq!(scenes.borrow().issues.len(), 4);
        assert_eq!(source.load_count(), 2);
    }

    #[tokio::test]
    async fn test_set_filter_rebuilds_without_reload() {
        let source = Arc::new(FixtureSource::new(fixture()));
        let live = LiveMap::start(source.clone()).await;

        live.set_filter(MarkerFilter::Urgent);
        let scene = live.scene();
        assert_eq!(scene.filter, MarkerFilter::Urgent);
        assert_eq!(scene.issues.len(), 1);
        assert_eq!(source.load_count(), 1, "filter flip must not hit the backend");

        live.set_filter(MarkerFilter::All);
        assert_eq!(live.scene().issues.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_source_renders_empty_scene() {
        let source = Arc::new(FixtureSource::new(Snapshot::default()));
        let live = LiveMap::start(source).await;
        let scene = live.scene();
        assert!(scene.issues.is_empty());
        assert!(scene.heat.points.is_empty());
        assert_eq!(scene.stats, SceneStats::default());
    }
}
