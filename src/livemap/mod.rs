//! The live map: density heat layer, marker overlay, worker staleness,
//! and the controller that keeps them synchronized with the backend.

pub mod controller;
pub mod heatmap;
pub mod markers;
pub mod staleness;

pub use controller::{build_scene, BackendSnapshots, LiveMap, MapScene, Snapshot, SnapshotSource};
pub use heatmap::{heat_points, HeatLayer, HeatPoint};
pub use markers::{IssueMarker, MarkerFilter, WorkerMarker};
pub use staleness::{classify, Activity};
