//! Marker overlay view models.
//!
//! One marker per qualifying issue and worker, rebuilt wholesale on each
//! refresh — no incremental diffing against the previous marker set.
//! Colors preserve the priority ordering visually (urgent red, high
//! orange, medium yellow, low green); workers take their bucket color
//! from the staleness classifier.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::livemap::staleness::{self, Activity};
use crate::types::{Issue, IssueStatus, Priority, WorkerProfile};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Client-side marker filter. Exactly one is active at a time; `All` is
/// the default and applies no narrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerFilter {
    #[default]
    All,
    /// Not yet picked up by anyone.
    Open,
    /// Assigned or actively being worked.
    Assigned,
    Urgent,
    High,
}

impl MarkerFilter {
    pub fn matches(self, issue: &Issue) -> bool {
        match self {
            MarkerFilter::All => true,
            MarkerFilter::Open => issue.status == IssueStatus::Pending,
            MarkerFilter::Assigned => matches!(
                issue.status,
                IssueStatus::Assigned | IssueStatus::InProgress
            ),
            MarkerFilter::Urgent => issue.priority == Priority::Urgent,
            MarkerFilter::High => issue.priority == Priority::High,
        }
    }
}

/// Priority palette. Ordering is carried by hue: red > orange > yellow >
/// green, gray for values outside the scale.
pub fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::Urgent => "#DC2626",
        Priority::High => "#EA580C",
        Priority::Medium => "#CA8A04",
        Priority::Low => "#16A34A",
        Priority::Unrecognized => "#6B7280",
    }
}

/// Status palette for popup badges.
pub fn status_color(status: IssueStatus) -> &'static str {
    match status {
        IssueStatus::Pending => "#EF4444",
        IssueStatus::Assigned => "#EAB308",
        IssueStatus::InProgress => "#3B82F6",
        IssueStatus::Completed => "#22C55E",
        IssueStatus::Verified => "#10B981",
        IssueStatus::Cancelled => "#6B7280",
    }
}

/// Popup content for an issue marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePopup {
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: Priority,
    pub address: String,
    pub citizen_name: String,
    pub citizen_phone: Option<String>,
    pub assigned_worker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueMarker {
    pub id: String,
    pub position: LatLng,
    pub color: String,
    pub popup: IssuePopup,
}

/// Popup content for a worker marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPopup {
    pub name: String,
    pub department: Option<String>,
    pub speciality: Option<String>,
    pub phone: Option<String>,
    pub activity: Activity,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerMarker {
    pub id: String,
    pub position: LatLng,
    pub activity: Activity,
    pub color: String,
    pub popup: WorkerPopup,
}

/// Build issue markers for the active filter. `worker_names` resolves
/// assigned-worker ids to display names for the popup.
pub fn issue_markers(
    issues: &[Issue],
    filter: MarkerFilter,
    worker_names: &HashMap<String, String>,
) -> Vec<IssueMarker> {
    issues
        .iter()
        .filter(|issue| filter.matches(issue))
        .filter_map(|issue| {
            let (lat, lng) = issue.coordinates()?;
            let assigned_worker = issue
                .assigned_worker_id
                .as_ref()
                .and_then(|id| worker_names.get(id).cloned());
            Some(IssueMarker {
                id: issue.id.clone(),
                position: LatLng { lat, lng },
                color: priority_color(issue.priority).to_string(),
                popup: IssuePopup {
                    title: issue.title.clone(),
                    description: issue.description.clone(),
                    status: issue.status,
                    priority: issue.priority,
                    address: issue.address.clone(),
                    citizen_name: issue.citizen_name.clone(),
                    citizen_phone: issue.citizen_phone.clone(),
                    assigned_worker,
                },
            })
        })
        .collect()
}

/// Build worker markers. Only approved workers with a live position
/// qualify; the activity bucket is recomputed from `now` on every call.
pub fn worker_markers(workers: &[WorkerProfile], now: DateTime<Utc>) -> Vec<WorkerMarker> {
    workers
        .iter()
        .filter(|w| w.is_locatable())
        .filter_map(|worker| {
            let (lat, lng) = worker.coordinates()?;
            let activity = staleness::classify(worker.updated_at, now);
            Some(WorkerMarker {
                id: worker.id.clone(),
                position: LatLng { lat, lng },
                activity,
                color: activity.color().to_string(),
                popup: WorkerPopup {
                    name: worker.full_name.clone(),
                    department: worker.department.clone(),
                    speciality: worker.speciality.clone(),
                    phone: worker.phone.clone(),
                    activity,
                    last_update: worker.updated_at,
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::types::{ApprovalStatus, Role};

    fn issue(
        id: &str,
        priority: Priority,
        status: IssueStatus,
        coords: Option<(f64, f64)>,
    ) -> Issue {
        let now = Utc::now();
        Issue {
            id: id.to_string(),
            created_at: now,
            updated_at: now,
            title: format!("issue {}", id),
            description: "desc".into(),
            category: "road".into(),
            priority,
            status,
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            address: "addr".into(),
            citizen_id: None,
            citizen_name: "citizen".into(),
            citizen_phone: Some("+91-99".into()),
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
            updated_at: now - Duration::minutes(minutes_ago),
            full_name: format!("worker {}", id),
            username: None,
            email: None,
            phone: Some("+91-88".into()),
            role: Role::Worker,
            department: Some("Sanitation".into()),
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

    fn sample_issues() -> Vec<Issue> {
        vec![
            issue("a", Priority::Urgent, IssueStatus::Pending, Some((28.61, 77.21))),
            issue("b", Priority::Urgent, IssueStatus::Assigned, Some((28.62, 77.22))),
            issue("c", Priority::Low, IssueStatus::Pending, Some((28.63, 77.23))),
            issue("d", Priority::Medium, IssueStatus::InProgress, Some((28.64, 77.24))),
            issue("e", Priority::High, IssueStatus::Completed, Some((28.65, 77.25))),
        ]
    }

    #[test]
    fn test_missing_longitude_excludes_marker() {
        let mut issues = sample_issues();
        issues[0].longitude = None;
        issues[3].longitude = None;
        let markers = issue_markers(&issues, MarkerFilter::All, &HashMap::new());
        assert_eq!(markers.len(), 3);
    }

    #[test]
    fn test_urgent_filter_selects_exactly_the_urgent_issues() {
        let markers = issue_markers(&sample_issues(), MarkerFilter::Urgent, &HashMap::new());
        let ids: Vec<&str> = markers.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_every_filter_is_a_subset_of_all() {
        let issues = sample_issues();
        let all: Vec<String> = issue_markers(&issues, MarkerFilter::All, &HashMap::new())
            .into_iter()
            .map(|m| m.id)
            .collect();
        for filter in [
            MarkerFilter::Open,
            MarkerFilter::Assigned,
            MarkerFilter::Urgent,
            MarkerFilter::High,
        ] {
            for marker in issue_markers(&issues, filter, &HashMap::new()) {
                assert!(all.contains(&marker.id), "{:?} produced {}", filter, marker.id);
            }
        }
        assert_eq!(all.len(), issues.len());
    }

    #[test]
    fn test_default_filter_is_all() {
        assert_eq!(MarkerFilter::default(), MarkerFilter::All);
    }

    #[test]
    fn test_assigned_filter_covers_in_progress() {
        let markers = issue_markers(&sample_issues(), MarkerFilter::Assigned, &HashMap::new());
        let ids: Vec<&str> = markers.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d"]);
    }

    #[test]
    fn test_popup_resolves_assigned_worker_name() {
        let mut issues = sample_issues();
        issues[1].assigned_worker_id = Some("w-9".into());
        let names = HashMap::from([("w-9".to_string(), "R. Sharma".to_string())]);
        let markers = issue_markers(&issues, MarkerFilter::All, &names);
        let assigned = markers.iter().find(|m| m.id == "b").expect("marker b");
        assert_eq!(assigned.popup.assigned_worker.as_deref(), Some("R. Sharma"));
    }

    #[test]
    fn test_marker_color_follows_priority_palette() {
        let markers = issue_markers(&sample_issues(), MarkerFilter::All, &HashMap::new());
        assert_eq!(markers[0].color, "#DC2626");
        assert_eq!(markers[2].color, "#16A34A");
    }

    #[test]
    fn test_worker_marker_color_tracks_staleness() {
        let now = Utc::now();
        let workers = vec![worker("w-1", 2), worker("w-2", 10), worker("w-3", 30)];
        let markers = worker_markers(&workers, now);
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].activity, Activity::Active);
        assert_eq!(markers[1].activity, Activity::Recent);
        assert_eq!(markers[2].activity, Activity::Offline);
        assert_eq!(markers[2].color, Activity::Offline.color());
    }

    #[test]
    fn test_unapproved_or_unlocated_workers_are_excluded() {
        let now = Utc::now();
        let mut pending = worker("w-1", 2);
        pending.approval_status = Some(ApprovalStatus::Pending);
        let mut adrift = worker("w-2", 2);
        adrift.current_latitude = None;
        let markers = worker_markers(&[pending, adrift, worker("w-3", 2)], now);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].id, "w-3");
    }
}
