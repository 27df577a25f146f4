//! Domain types shared across the crate.
//!
//! These are the typed shapes of backend rows, validated once at the
//! response boundary (`backend::client`). Downstream code relies on the
//! types instead of re-checking field presence ad hoc. Column names are
//! snake_case to match the hosted schema, so no serde renames are needed
//! on row structs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Issue lifecycle
// ---------------------------------------------------------------------------

/// Issue priority, totally ordered for heat weighting.
///
/// `Unrecognized` absorbs values outside the known scale; it weighs and
/// sorts like the bottom of the scale but renders gray, not green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Unrecognized,
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Mobile clients have shipped values outside the scale; anything
    /// unknown lands in `Unrecognized` instead of failing the row.
    pub fn parse(value: &str) -> Self {
        match value {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Unrecognized,
        }
    }

    /// Heat weight on the fixed ordinal scale: urgent=4, high=3, medium=2,
    /// low=1. Unrecognized values weigh 1.
    pub fn weight(self) -> f64 {
        match self {
            Priority::Urgent => 4.0,
            Priority::High => 3.0,
            Priority::Medium => 2.0,
            Priority::Low | Priority::Unrecognized => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Priority::parse(&value))
    }
}

/// Issue status lifecycle.
///
/// Forward order is pending -> assigned -> in_progress -> completed ->
/// verified; `cancelled` is a sideways terminal state reachable from any
/// non-terminal status. The hosted backend does not enforce this — the
/// admin mutation path does (see `services::issues::update_task_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Verified,
    Cancelled,
}

impl IssueStatus {
    /// Position in the forward lifecycle. `Cancelled` sits outside it.
    pub fn lifecycle_rank(self) -> Option<u8> {
        match self {
            IssueStatus::Pending => Some(0),
            IssueStatus::Assigned => Some(1),
            IssueStatus::InProgress => Some(2),
            IssueStatus::Completed => Some(3),
            IssueStatus::Verified => Some(4),
            IssueStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, IssueStatus::Verified | IssueStatus::Cancelled)
    }

    /// Whether an admin may move an issue from `self` to `to`: strictly
    /// forward along the lifecycle, or sideways to cancelled from any
    /// non-terminal status.
    pub fn can_transition_to(self, to: IssueStatus) -> bool {
        if to == IssueStatus::Cancelled {
            return !self.is_terminal();
        }
        match (self.lifecycle_rank(), to.lifecycle_rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::Assigned => "assigned",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Completed => "completed",
            IssueStatus::Verified => "verified",
            IssueStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A citizen-reported issue (row in `tasks`).
///
/// Latitude and longitude are nullable in the schema; rows missing either
/// are excluded from map rendering but still appear in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub priority: Priority,
    pub status: IssueStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: String,
    pub citizen_id: Option<String>,
    #[serde(default)]
    pub citizen_name: String,
    pub citizen_phone: Option<String>,
    pub assigned_worker_id: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub completion_notes: Option<String>,
    pub photos: Option<Vec<String>>,
    /// Explicit urgency override; when present it replaces the
    /// priority-derived heat weight.
    pub urgency_score: Option<f64>,
}

impl Issue {
    /// Both coordinates, or nothing. Map layers only see issues through this.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Profile role as stored by the mobile backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Worker,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A profile row (`profiles`). Workers are profiles with `role = worker`;
/// their mobile client continuously writes `current_latitude`/`longitude`
/// and bumps `updated_at`, which drives the staleness classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub full_name: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub department: Option<String>,
    pub speciality: Option<String>,
    pub approval_status: Option<ApprovalStatus>,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    pub avatar_url: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub application_id: Option<String>,
}

impl WorkerProfile {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.current_latitude, self.current_longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Only approved workers with a live position appear on the map.
    pub fn is_locatable(&self) -> bool {
        self.role == Role::Worker
            && self.approval_status == Some(ApprovalStatus::Approved)
            && self.coordinates().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// A field-worker onboarding application (`worker_applications`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerApplication {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub speciality: String,
    pub experience_years: Option<i32>,
    pub education: Option<String>,
    pub previous_work: Option<String>,
    pub status: ApplicationStatus,
    pub application_date: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub admin_notes: Option<String>,
    pub skills: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
    /// Auth identity the approved profile is keyed by.
    pub auth_user_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminActionKind {
    AssignTask,
    UpdateTaskStatus,
    ApproveWorker,
    RejectWorker,
}

/// An audit-log row (`admin_actions`), written best-effort alongside every
/// admin mutation. Ids are generated client-side (`act-{uuid}`);
/// `created_at` is backend-assigned and omitted on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub admin_id: String,
    pub action_type: AdminActionKind,
    pub target_id: String,
    pub details: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A raw change-feed event. The payload is untyped by design — subscribers
/// reload a full snapshot rather than patching from `record`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub record: Option<Value>,
    pub old_record: Option<Value>,
}

// ---------------------------------------------------------------------------
// List filters
// ---------------------------------------------------------------------------

/// Equality predicates for issue listings. All fields optional; `None`
/// means unfiltered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub assigned_worker_id: Option<String>,
}
