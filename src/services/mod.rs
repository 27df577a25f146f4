//! Admin services: the operations the dashboard performs against the
//! backend, sharing one error policy — reads degrade to empty results
//! with a logged warning, writes return typed errors, and every mutation
//! leaves a best-effort audit row.

pub mod analytics;
pub mod applications;
pub mod issues;
pub mod workers;

use serde_json::Value;
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::types::{AdminAction, AdminActionKind};

/// Record an admin mutation in the audit log. Best-effort: a failed
/// audit write must never fail the mutation it describes, so the error
/// is logged and swallowed.
pub(crate) async fn record_admin_action(
    client: &BackendClient,
    admin_id: &str,
    action_type: AdminActionKind,
    target_id: &str,
    details: Value,
) {
    let action = AdminAction {
        id: Some(format!("act-{}", Uuid::new_v4())),
        admin_id: admin_id.to_string(),
        action_type,
        target_id: target_id.to_string(),
        details,
        created_at: None,
    };
    let body = match serde_json::to_value(&action) {
        Ok(body) => body,
        Err(e) => {
            log::warn!("Audit: failed to serialize admin action: {}", e);
            return;
        }
    };
    if let Err(e) = client.insert("admin_actions", &body).await {
        log::warn!("Audit: failed to record {:?} on {}: {}", action_type, target_id, e);
    }
}
