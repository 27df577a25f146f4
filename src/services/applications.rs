//! Worker onboarding: application review, approval, rejection.
//!
//! Approval prefers the backend's stored procedure (which creates the
//! profile atomically); when the procedure is missing the manual path
//! marks the application approved and upserts the worker profile in two
//! writes, matching what the mobile side expects to find.

use chrono::Utc;
use serde_json::json;

use crate::backend::BackendClient;
use crate::error::ServiceError;
use crate::types::{AdminActionKind, ApplicationStatus, WorkerApplication};

/// Applications awaiting review, newest first.
pub async fn get_pending_applications(client: &BackendClient) -> Vec<WorkerApplication> {
    match client
        .select("worker_applications")
        .eq("status", "pending")
        .order_desc("application_date")
        .fetch()
        .await
    {
        Ok(applications) => applications,
        Err(e) => {
            log::warn!("Applications: fetch failed, serving empty list: {}", e);
            Vec::new()
        }
    }
}

/// Paged application listing with the exact total for the pager.
/// `page` is 1-based.
pub async fn get_applications(
    client: &BackendClient,
    page: usize,
    per_page: usize,
    status: Option<ApplicationStatus>,
) -> Result<(Vec<WorkerApplication>, usize), ServiceError> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let from = (page - 1) * per_page;
    let to = from + per_page - 1;

    let mut query = client
        .select("worker_applications")
        .order_desc("application_date")
        .range(from, to);
    if let Some(status) = status {
        query = query.eq("status", status.as_str());
    }

    let (applications, total) = query.fetch_counted().await?;
    Ok((applications, total))
}

/// Approve an application. Tries the backend stored procedure first;
/// falls back to the manual two-write path when it is unavailable.
pub async fn approve_application(
    client: &BackendClient,
    application_id: &str,
    admin_id: &str,
    admin_notes: Option<&str>,
) -> Result<(), ServiceError> {
    let rpc_args = json!({
        "application_id": application_id,
        "admin_user_id": admin_id,
    });
    match client.rpc("approve_worker_application", &rpc_args).await {
        Ok(_) => {
            log::info!("Applications: approved {} via stored procedure", application_id);
        }
        Err(e) => {
            log::warn!(
                "Applications: stored procedure unavailable ({}), approving manually",
                e
            );
            approve_manually(client, application_id, admin_id, admin_notes).await?;
        }
    }

    super::record_admin_action(
        client,
        admin_id,
        AdminActionKind::ApproveWorker,
        application_id,
        json!({ "application_id": application_id, "notes": admin_notes }),
    )
    .await;

    Ok(())
}

async fn approve_manually(
    client: &BackendClient,
    application_id: &str,
    admin_id: &str,
    admin_notes: Option<&str>,
) -> Result<(), ServiceError> {
    let application: WorkerApplication = client
        .select("worker_applications")
        .eq("id", application_id)
        .fetch_one()
        .await?
        .ok_or(ServiceError::NotFound {
            entity: "worker application",
            id: application_id.to_string(),
        })?;

    let now = Utc::now();
    client
        .update(
            "worker_applications",
            application_id,
            &json!({
                "status": ApplicationStatus::Approved,
                "reviewed_at": now,
                "reviewed_by": admin_id,
                "admin_notes": admin_notes,
            }),
        )
        .await?;

    // The profile is keyed by the applicant's auth identity; fall back to
    // the application id for legacy rows that predate auth linking.
    let profile_id = application
        .auth_user_id
        .clone()
        .unwrap_or_else(|| application.id.clone());
    client
        .upsert(
            "profiles",
            &json!({
                "id": profile_id,
                "full_name": application.full_name,
                "username": application.username,
                "email": application.email,
                "role": "worker",
                "department": application.department,
                "speciality": application.speciality,
                "approval_status": "approved",
                "approved_at": now,
                "approved_by": admin_id,
                "application_id": application.id,
                "updated_at": now,
            }),
        )
        .await?;

    Ok(())
}

/// Reject an application with a reason the applicant will see.
pub async fn reject_application(
    client: &BackendClient,
    application_id: &str,
    admin_id: &str,
    reason: &str,
    admin_notes: Option<&str>,
) -> Result<(), ServiceError> {
    client
        .update(
            "worker_applications",
            application_id,
            &json!({
                "status": ApplicationStatus::Rejected,
                "reviewed_at": Utc::now(),
                "reviewed_by": admin_id,
                "rejection_reason": reason,
                "admin_notes": admin_notes,
            }),
        )
        .await?;

    super::record_admin_action(
        client,
        admin_id,
        AdminActionKind::RejectWorker,
        application_id,
        json!({ "application_id": application_id, "reason": reason, "notes": admin_notes }),
    )
    .await;

    log::info!("Applications: rejected {}", application_id);
    Ok(())
}
