//! Issue-density heat layer.
//!
//! Every issue with both coordinates contributes exactly one weighted
//! point. Weights pass through raw — no normalization or clustering; the
//! rendering library's gradient handles scale.

use serde::{Deserialize, Serialize};

use crate::types::{Issue, IssueStatus, Priority};

/// One weighted point in the density layer. Carries identity and display
/// fields so the UI can cross-link a hot spot back to its markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatPoint {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub weight: f64,
    pub title: String,
    pub status: IssueStatus,
    pub priority: Priority,
}

/// Heat-layer rendering defaults handed to the map library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatLayer {
    pub points: Vec<HeatPoint>,
    pub radius: u32,
    pub opacity: f64,
}

impl HeatLayer {
    pub fn new(points: Vec<HeatPoint>) -> Self {
        Self {
            points,
            radius: 24,
            opacity: 0.6,
        }
    }
}

/// The heat weight for one issue: explicit urgency score when present,
/// otherwise the fixed priority scale.
pub fn heat_weight(issue: &Issue) -> f64 {
    issue.urgency_score.unwrap_or_else(|| issue.priority.weight())
}

/// Project the issue snapshot onto weighted points, excluding rows
/// missing either coordinate.
pub fn heat_points(issues: &[Issue]) -> Vec<HeatPoint> {
    issues
        .iter()
        .filter_map(|issue| {
            let (lat, lng) = issue.coordinates()?;
            Some(HeatPoint {
                id: issue.id.clone(),
                lat,
                lng,
                weight: heat_weight(issue),
                title: issue.title.clone(),
                status: issue.status,
                priority: issue.priority,
            })
        })
        .collect()
}
