//! Issue listing, dispatch, and status updates.

use chrono::Utc;
use serde_json::json;

use crate::backend::BackendClient;
use crate::error::ServiceError;
use crate::types::{AdminActionKind, Issue, IssueFilter, IssueStatus};

/// All issues matching the filter, newest first.
///
/// Backend failures degrade to an empty list: callers treat "no rows" as
/// "no data yet", and the error goes to the log for diagnostics.
pub async fn get_tasks(client: &BackendClient, filter: &IssueFilter) -> Vec<Issue> {
    let mut query = client.select("tasks").order_desc("created_at");
    if let Some(status) = filter.status {
        query = query.eq("status", status.as_str());
    }
    if let Some(ref category) = filter.category {
        query = query.eq("category", category);
    }
    if let Some(priority) = filter.priority {
        query = query.eq("priority", priority.as_str());
    }
    if let Some(ref worker_id) = filter.assigned_worker_id {
        query = query.eq("assigned_worker_id", worker_id);
    }

    match query.fetch().await {
        Ok(issues) => issues,
        Err(e) => {
            log::warn!("Issues: fetch failed, serving empty list: {}", e);
            Vec::new()
        }
    }
}

/// One issue by id.
pub async fn get_task(client: &BackendClient, task_id: &str) -> Result<Issue, ServiceError> {
    client
        .select("tasks")
        .eq("id", task_id)
        .fetch_one()
        .await?
        .ok_or(ServiceError::NotFound {
            entity: "task",
            id: task_id.to_string(),
        })
}

/// Assign an issue to a worker. Sets the worker reference, stamps
/// `assigned_at`, and moves the status to `assigned` (lifecycle-checked
/// against the current row).
pub async fn assign_task(
    client: &BackendClient,
    task_id: &str,
    worker_id: &str,
    admin_id: &str,
) -> Result<(), ServiceError> {
    let current = get_task(client, task_id).await?;
    if !current.status.can_transition_to(IssueStatus::Assigned) {
        return Err(ServiceError::IllegalTransition {
            from: current.status,
            to: IssueStatus::Assigned,
        });
    }

    let now = Utc::now();
    let fields = json!({
        "assigned_worker_id": worker_id,
        "assigned_at": now,
        "status": IssueStatus::Assigned,
        "updated_at": now,
    });
    client.update("tasks", task_id, &fields).await?;

    super::record_admin_action(
        client,
        admin_id,
        AdminActionKind::AssignTask,
        task_id,
        json!({ "worker_id": worker_id, "task_id": task_id }),
    )
    .await;

    log::info!("Issues: assigned {} to worker {}", task_id, worker_id);
    Ok(())
}

/// Move an issue along its lifecycle. Rejects backward moves and moves
/// out of terminal states before touching the backend; stamps the
/// per-status timestamp on the way through.
pub async fn update_task_status(
    client: &BackendClient,
    task_id: &str,
    new_status: IssueStatus,
    admin_id: &str,
    notes: Option<&str>,
) -> Result<(), ServiceError> {
    let current = get_task(client, task_id).await?;
    if !current.status.can_transition_to(new_status) {
        return Err(ServiceError::IllegalTransition {
            from: current.status,
            to: new_status,
        });
    }

    let now = Utc::now();
    let mut fields = json!({
        "status": new_status,
        "updated_at": now,
    });
    match new_status {
        IssueStatus::InProgress => fields["started_at"] = json!(now),
        IssueStatus::Completed => fields["completed_at"] = json!(now),
        IssueStatus::Verified => fields["verified_at"] = json!(now),
        _ => {}
    }
    if let Some(notes) = notes {
        fields["completion_notes"] = json!(notes);
    }
    client.update("tasks", task_id, &fields).await?;

    super::record_admin_action(
        client,
        admin_id,
        AdminActionKind::UpdateTaskStatus,
        task_id,
        json!({
            "old_status": current.status,
            "new_status": new_status,
            "notes": notes,
        }),
    )
    .await;

    log::info!(
        "Issues: {} moved {} -> {}",
        task_id,
        current.status,
        new_status
    );
    Ok(())
}
