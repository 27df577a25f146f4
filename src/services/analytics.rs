//! Dashboard aggregates over the issue and worker snapshots.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::BackendClient;
use crate::services::workers::{worker_stats, WorkerStats};
use crate::types::{Issue, IssueStatus, WorkerProfile};

/// How many recent activities the dashboard shows.
const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTallies {
    pub total: usize,
    pub pending: usize,
    pub assigned: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub verified: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub title: String,
    pub status: IssueStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalytics {
    pub tasks: TaskTallies,
    pub workers: WorkerStats,
    pub issues_by_category: HashMap<String, usize>,
    pub issues_by_priority: HashMap<String, usize>,
    /// Share of issues completed or verified, in percent.
    pub completion_rate: f64,
    /// Mean created-to-completed time across resolved issues, in hours.
    pub avg_resolution_hours: f64,
    pub recent_activities: Vec<ActivityEntry>,
}

/// Aggregate the snapshots. Pure; `now` is injected for the worker
/// staleness buckets.
pub fn summarize(
    issues: &[Issue],
    workers: &[WorkerProfile],
    now: DateTime<Utc>,
) -> DashboardAnalytics {
    let mut tasks = TaskTallies::default();
    let mut by_category: HashMap<String, usize> = HashMap::new();
    let mut by_priority: HashMap<String, usize> = HashMap::new();
    let mut resolution_hours = 0.0;
    let mut resolved = 0usize;

    for issue in issues {
        tasks.total += 1;
        match issue.status {
            IssueStatus::Pending => tasks.pending += 1,
            IssueStatus::Assigned => tasks.assigned += 1,
            IssueStatus::InProgress => tasks.in_progress += 1,
            IssueStatus::Completed => tasks.completed += 1,
            IssueStatus::Verified => tasks.verified += 1,
            IssueStatus::Cancelled => tasks.cancelled += 1,
        }
        *by_category.entry(issue.category.clone()).or_default() += 1;
        *by_priority
            .entry(issue.priority.as_str().to_string())
            .or_default() += 1;

        if let Some(completed_at) = issue.completed_at {
            let elapsed = completed_at - issue.created_at;
            resolution_hours += elapsed.num_seconds() as f64 / 3600.0;
            resolved += 1;
        }
    }

    let mut recent: Vec<ActivityEntry> = issues
        .iter()
        .map(|issue| ActivityEntry {
            id: issue.id.clone(),
            title: issue.title.clone(),
            status: issue.status,
            timestamp: issue.created_at,
        })
        .collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(RECENT_ACTIVITY_LIMIT);

    let completion_rate = if tasks.total > 0 {
        (tasks.completed + tasks.verified) as f64 / tasks.total as f64 * 100.0
    } else {
        0.0
    };
    let avg_resolution_hours = if resolved > 0 {
        resolution_hours / resolved as f64
    } else {
        0.0
    };

    DashboardAnalytics {
        tasks,
        workers: worker_stats(workers, now),
        issues_by_category: by_category,
        issues_by_priority: by_priority,
        completion_rate,
        avg_resolution_hours,
        recent_activities: recent,
    }
}

/// Fetch-and-aggregate wrapper. Degrades to zeroed aggregates on backend
/// failure; the dashboard renders empty tiles instead of an error state.
pub async fn dashboard_analytics(client: &BackendClient) -> DashboardAnalytics {
    let issues: Vec<Issue> = match client.select("tasks").fetch().await {
        Ok(issues) => issues,
        Err(e) => {
            log::warn!("Analytics: task fetch failed, serving zeroes: {}", e);
            return DashboardAnalytics::default();
        }
    };
    let workers: Vec<WorkerProfile> = match client
        .select("profiles")
        .eq("role", "worker")
        .fetch()
        .await
    {
        Ok(workers) => workers,
        Err(e) => {
            log::warn!("Analytics: worker fetch failed, serving task stats only: {}", e);
            Vec::new()
        }
    };
    summarize(&issues, &workers, Utc::now())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::types::Priority;

    fn issue(
        id: &str,
        category: &str,
        priority: Priority,
        status: IssueStatus,
        age_hours: i64,
        resolution_hours: Option<i64>,
    ) -> Issue {
        let now = Utc::now();
        let created = now - Duration::hours(age_hours);
        Issue {
            id: id.to_string(),
            created_at: created,
            updated_at: now,
            title: format!("issue {}", id),
            description: String::new(),
            category: category.to_string(),
            priority,
            status,
            latitude: None,
            longitude: None,
            address: String::new(),
            citizen_id: None,
            citizen_name: String::new(),
            citizen_phone: None,
            assigned_worker_id: None,
            assigned_at: None,
            started_at: None,
            completed_at: resolution_hours.map(|h| created + Duration::hours(h)),
            verified_at: None,
            completion_notes: None,
            photos: None,
            urgency_score: None,
        }
    }

    #[test]
    fn test_summarize_tallies_and_maps() {
        let issues = vec![
            issue("a", "road", Priority::Urgent, IssueStatus::Pending, 10, None),
            issue("b", "road", Priority::Low, IssueStatus::Completed, 20, Some(6)),
            issue("c", "water", Priority::High, IssueStatus::Verified, 30, Some(12)),
            issue("d", "water", Priority::High, IssueStatus::InProgress, 5, None),
        ];
        let analytics = summarize(&issues, &[], Utc::now());

        assert_eq!(analytics.tasks.total, 4);
        assert_eq!(analytics.tasks.pending, 1);
        assert_eq!(analytics.tasks.completed, 1);
        assert_eq!(analytics.tasks.verified, 1);
        assert_eq!(analytics.issues_by_category["road"], 2);
        assert_eq!(analytics.issues_by_category["water"], 2);
        assert_eq!(analytics.issues_by_priority["high"], 2);
        assert!((analytics.completion_rate - 50.0).abs() < 1e-9);
        assert!((analytics.avg_resolution_hours - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_recent_activities_newest_first_capped_at_ten() {
        let issues: Vec<Issue> = (0..15)
            .map(|i| {
                issue(
                    &format!("t-{}", i),
                    "road",
                    Priority::Low,
                    IssueStatus::Pending,
                    i,
                    None,
                )
            })
            .collect();
        let analytics = summarize(&issues, &[], Utc::now());
        assert_eq!(analytics.recent_activities.len(), 10);
        assert_eq!(analytics.recent_activities[0].id, "t-0");
        assert!(analytics
            .recent_activities
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn test_summarize_empty_inputs() {
        let analytics = summarize(&[], &[], Utc::now());
        assert_eq!(analytics.tasks.total, 0);
        assert_eq!(analytics.completion_rate, 0.0);
        assert_eq!(analytics.avg_resolution_hours, 0.0);
        assert!(analytics.recent_activities.is_empty());
    }
}
