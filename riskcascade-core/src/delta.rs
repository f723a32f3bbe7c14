//! Snapshot comparison
//!
//! Computes deterministic deltas between two result snapshots.
//!
//! Global invariants enforced:
//! - Hazards matched by id (a renamed id is remove + new)
//! - Entries sorted by hazard id
//! - Status compares the complete hazard record, so a change in any computed
//!   field is `modified`

use crate::aggregates::{compute_delta_aggregates, DeltaAggregates};
use crate::scenario::Scenario;
use crate::snapshot::{HazardSnapshot, ResultSnapshot, SNAPSHOT_SCHEMA_VERSION};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Schema version for deltas
const DELTA_SCHEMA_VERSION: u32 = 1;

/// Hazard change status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HazardStatus {
    New,
    Removed,
    Modified,
    Unchanged,
}

impl HazardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardStatus::New => "new",
            HazardStatus::Removed => "removed",
            HazardStatus::Modified => "modified",
            HazardStatus::Unchanged => "unchanged",
        }
    }
}

/// Hazard state at its MRS (before or after)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct HazardState {
    pub mrs: Scenario,
    pub total_probability: f64,
    pub total_impact: f64,
    pub total_risk: f64,
}

impl HazardState {
    fn of(hazard: &HazardSnapshot) -> Self {
        let result = hazard.mrs_result();
        HazardState {
            mrs: hazard.mrs,
            total_probability: result.probability.total,
            total_impact: result.impact.total_absolute,
            total_risk: result.total_risk,
        }
    }
}

/// MRS transition information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MrsTransition {
    pub from: Scenario,
    pub to: Scenario,
}

/// Single hazard delta entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct HazardDeltaEntry {
    pub hazard_id: String,
    pub category: String,
    pub status: HazardStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<HazardState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<HazardState>,
    /// Change in MRS total risk (after - before; missing side counts as 0)
    pub risk_delta: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrs_transition: Option<MrsTransition>,
}

/// Complete delta between two snapshots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SnapshotDelta {
    pub schema_version: u32,
    pub entries: Vec<HazardDeltaEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregates: Option<DeltaAggregates>,
}

impl SnapshotDelta {
    /// Compare `after` against `before`
    pub fn new(before: &ResultSnapshot, after: &ResultSnapshot) -> Result<Self> {
        validate_snapshot_version("before", before)?;
        validate_snapshot_version("after", after)?;

        let before_map: HashMap<&str, &HazardSnapshot> = before
            .hazards
            .iter()
            .map(|h| (h.hazard_id.as_str(), h))
            .collect();
        let after_map: HashMap<&str, &HazardSnapshot> = after
            .hazards
            .iter()
            .map(|h| (h.hazard_id.as_str(), h))
            .collect();

        let all_ids: BTreeSet<&str> = before_map.keys().chain(after_map.keys()).copied().collect();
        let entries = all_ids
            .into_iter()
            .filter_map(|id| {
                delta_entry(id, before_map.get(id).copied(), after_map.get(id).copied())
            })
            .collect();

        Ok(SnapshotDelta {
            schema_version: DELTA_SCHEMA_VERSION,
            entries,
            aggregates: None,
        })
    }

    /// Attach per-category rollups of the entries
    pub fn with_aggregates(mut self) -> Self {
        self.aggregates = Some(compute_delta_aggregates(&self));
        self
    }

    /// Entries with any status other than `unchanged`
    pub fn changed(&self) -> impl Iterator<Item = &HazardDeltaEntry> {
        self.entries
            .iter()
            .filter(|e| e.status != HazardStatus::Unchanged)
    }

    /// Serialize delta to JSON string (deterministic ordering)
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize delta to JSON")
    }

    /// Deserialize delta from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let delta: SnapshotDelta =
            serde_json::from_str(json).context("failed to deserialize delta from JSON")?;

        if delta.schema_version != DELTA_SCHEMA_VERSION {
            anyhow::bail!(
                "delta schema version mismatch: expected {}, got {}",
                DELTA_SCHEMA_VERSION,
                delta.schema_version
            );
        }

        Ok(delta)
    }
}

fn validate_snapshot_version(side: &str, snapshot: &ResultSnapshot) -> Result<()> {
    if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
        anyhow::bail!(
            "{} snapshot schema version mismatch: expected {}, got {}",
            side,
            SNAPSHOT_SCHEMA_VERSION,
            snapshot.schema_version
        );
    }
    Ok(())
}

fn delta_entry(
    hazard_id: &str,
    before: Option<&HazardSnapshot>,
    after: Option<&HazardSnapshot>,
) -> Option<HazardDeltaEntry> {
    let status = match (before, after) {
        (Some(b), Some(a)) if b == a => HazardStatus::Unchanged,
        (Some(_), Some(_)) => HazardStatus::Modified,
        (Some(_), None) => HazardStatus::Removed,
        (None, Some(_)) => HazardStatus::New,
        (None, None) => return None,
    };

    let before_state = before.map(HazardState::of);
    let after_state = after.map(HazardState::of);
    let risk_delta = after_state.as_ref().map_or(0.0, |s| s.total_risk)
        - before_state.as_ref().map_or(0.0, |s| s.total_risk);
    let mrs_transition = match (&before_state, &after_state) {
        (Some(b), Some(a)) if b.mrs != a.mrs => Some(MrsTransition {
            from: b.mrs,
            to: a.mrs,
        }),
        _ => None,
    };
    let category = after
        .or(before)
        .map(|h| h.category.clone())
        .unwrap_or_default();

    Some(HazardDeltaEntry {
        hazard_id: hazard_id.to_string(),
        category,
        status,
        before: before_state,
        after: after_state,
        risk_delta,
        mrs_transition,
    })
}
