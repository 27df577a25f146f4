//! Worker listings and fleet statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::BackendClient;
use crate::livemap::staleness::{self, Activity};
use crate::types::WorkerProfile;

/// Approved workers, alphabetical.
pub async fn get_approved_workers(client: &BackendClient) -> Vec<WorkerProfile> {
    match client
        .select("profiles")
        .eq("role", "worker")
        .eq("approval_status", "approved")
        .order_asc("full_name")
        .fetch()
        .await
    {
        Ok(workers) => workers,
        Err(e) => {
            log::warn!("Workers: fetch failed, serving empty list: {}", e);
            Vec::new()
        }
    }
}

/// Approved workers with a live position, freshest ping first. This is
/// the worker feed for the location overlay.
pub async fn get_workers_with_location(client: &BackendClient) -> Vec<WorkerProfile> {
    match client
        .select("profiles")
        .eq("role", "worker")
        .eq("approval_status", "approved")
        .not_null("current_latitude")
        .not_null("current_longitude")
        .order_desc("updated_at")
        .fetch()
        .await
    {
        Ok(workers) => workers,
        Err(e) => {
            log::warn!("Workers: location fetch failed, serving empty list: {}", e);
            Vec::new()
        }
    }
}

/// Fleet counters for the dashboard header.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStats {
    pub total: usize,
    pub active: usize,
    pub recent: usize,
    pub offline: usize,
    pub pending_approval: usize,
}

/// Bucket the fleet by approval state and ping recency. Pure; `now` is
/// injected so the buckets are reproducible.
pub fn worker_stats(workers: &[WorkerProfile], now: DateTime<Utc>) -> WorkerStats {
    let mut stats = WorkerStats::default();
    for worker in workers {
        stats.total += 1;
        match worker.approval_status {
            Some(crate::types::ApprovalStatus::Pending) => stats.pending_approval += 1,
            Some(crate::types::ApprovalStatus::Approved) => {
                match staleness::classify(worker.updated_at, now) {
                    Activity::Active => stats.active += 1,
                    Activity::Recent => stats.recent += 1,
                    Activity::Offline => stats.offline += 1,
                }
            }
            _ => {}
        }
    }
    stats
}

/// Fetch-and-bucket wrapper; degrades to zeroed counters on failure.
pub async fn get_worker_stats(client: &BackendClient) -> WorkerStats {
    let workers: Vec<WorkerProfile> = match client
        .select("profiles")
        .eq("role", "worker")
        .fetch()
        .await
    {
        Ok(workers) => workers,
        Err(e) => {
            log::warn!("Workers: stats fetch failed, serving zeroes: {}", e);
            return WorkerStats::default();
        }
    };
    worker_stats(&workers, Utc::now())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::types::{ApprovalStatus, Role};

    fn worker(id: &str, approval: Option<ApprovalStatus>, minutes_ago: i64) -> WorkerProfile {
        let now = Utc::now();
        WorkerProfile {
            id: id.to_string(),
            created_at: now,
            updated_at: now - Duration::minutes(minutes_ago),
            full_name: id.to_string(),
            username: None,
            email: None,
            phone: None,
            role: Role::Worker,
            department: None,
            speciality: None,
            approval_status: approval,
            current_latitude: Some(28.6),
            current_longitude: Some(77.2),
            avatar_url: None,
            approved_at: None,
            approved_by: None,
            application_id: None,
        }
    }

    #[test]
    fn test_worker_stats_buckets() {
        let now = Utc::now();
        let fleet = vec![
            worker("w-1", Some(ApprovalStatus::Approved), 1),
            worker("w-2", Some(ApprovalStatus::Approved), 4),
            worker("w-3", Some(ApprovalStatus::Approved), 10),
            worker("w-4", Some(ApprovalStatus::Approved), 40),
            worker("w-5", Some(ApprovalStatus::Pending), 1),
            worker("w-6", Some(ApprovalStatus::Rejected), 1),
        ];
        let stats = worker_stats(&fleet, now);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.recent, 1);
        assert_eq!(stats.offline, 1);
        assert_eq!(stats.pending_approval, 1);
    }

    #[test]
    fn test_worker_stats_empty_fleet() {
        assert_eq!(worker_stats(&[], Utc::now()), WorkerStats::default());
    }
}
