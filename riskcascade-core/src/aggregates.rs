//! Catalogue aggregation views
//!
//! Computes rollups over hazard records without modifying them.
//!
//! Global invariants enforced:
//! - Aggregates are strictly derived (never stored, always computed)
//! - Deterministic ordering by group key
//! - Every hazard counts in exactly one category group and one type group

use crate::delta::{HazardStatus, SnapshotDelta};
use crate::scenario::ScenarioMap;
use crate::snapshot::HazardSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rollup of the hazards sharing one group key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GroupAggregates {
    pub group: String,
    pub hazard_count: usize,
    /// Sum of MRS total risk
    pub sum_risk: f64,
    /// Max of MRS total risk
    pub max_risk: f64,
    pub riskiest_hazard: String,
    /// Hazards per selected MRS
    pub mrs_counts: ScenarioMap<usize>,
}

/// Catalogue aggregates container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CatalogueAggregates {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub categories: Vec<GroupAggregates>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub types: Vec<GroupAggregates>,
}

impl CatalogueAggregates {
    pub fn compute(hazards: &[HazardSnapshot]) -> Self {
        CatalogueAggregates {
            categories: group_by(hazards, |h| category_key(&h.category)),
            types: group_by(hazards, |h| h.hazard_type.as_str().to_string()),
        }
    }
}

/// Net change of one category between two snapshots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CategoryDeltaAggregates {
    pub category: String,
    pub net_risk_delta: f64,
    /// Hazards whose MRS risk went up
    pub increase_count: usize,
}

/// Delta aggregates container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct DeltaAggregates {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub categories: Vec<CategoryDeltaAggregates>,
}

/// Hazards without a category are grouped under "uncategorized"
fn category_key(category: &str) -> String {
    let category = category.trim();
    if category.is_empty() {
        "uncategorized".to_string()
    } else {
        category.to_string()
    }
}

fn group_by(
    hazards: &[HazardSnapshot],
    key: impl Fn(&HazardSnapshot) -> String,
) -> Vec<GroupAggregates> {
    let mut groups: BTreeMap<String, GroupAggregates> = BTreeMap::new();

    for hazard in hazards {
        let risk = hazard.mrs_risk();
        let group = key(hazard);
        let entry = groups.entry(group.clone()).or_insert_with(|| GroupAggregates {
            group,
            hazard_count: 0,
            sum_risk: 0.0,
            max_risk: 0.0,
            riskiest_hazard: hazard.hazard_id.clone(),
            mrs_counts: ScenarioMap::default(),
        });

        entry.hazard_count += 1;
        entry.sum_risk += risk;
        // Strict comparison keeps the first (lowest id) hazard on ties
        if risk > entry.max_risk {
            entry.max_risk = risk;
            entry.riskiest_hazard = hazard.hazard_id.clone();
        }
        *entry.mrs_counts.get_mut(hazard.mrs) += 1;
    }

    groups.into_values().collect()
}

/// Compute delta aggregates from delta entries
pub fn compute_delta_aggregates(delta: &SnapshotDelta) -> DeltaAggregates {
    let mut data: BTreeMap<String, (f64, usize)> = BTreeMap::new();

    for entry in &delta.entries {
        if entry.status == HazardStatus::Unchanged {
            continue;
        }
        let slot = data.entry(category_key(&entry.category)).or_insert((0.0, 0));
        slot.0 += entry.risk_delta;
        if entry.risk_delta > 0.0 {
            slot.1 += 1;
        }
    }

    let categories = data
        .into_iter()
        .map(|(category, (net_risk_delta, increase_count))| CategoryDeltaAggregates {
            category,
            net_risk_delta,
            increase_count,
        })
        .collect();

    DeltaAggregates { categories }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazard::HazardType;
    use crate::scenario::Scenario;
    use crate::snapshot::ScenarioResult;

    fn create_test_hazard(
        id: &str,
        category: &str,
        hazard_type: HazardType,
        risk: f64,
    ) -> HazardSnapshot {
        let mut scenarios: ScenarioMap<ScenarioResult> = ScenarioMap::default();
        scenarios.major.total_risk = risk;
        scenarios.major.is_mrs = true;
        HazardSnapshot {
            hazard_id: id.to_string(),
            name: id.to_string(),
            hazard_type,
            category: category.to_string(),
            mrs: Scenario::Major,
            in_cascade_cycle: false,
            incoming_edges: 0,
            outgoing_edges: 0,
            scenarios,
            issues: vec![],
        }
    }

    #[test]
    fn test_category_groups() {
        let hazards = vec![
            create_test_hazard("drought", "nature", HazardType::Standard, 2.0e5),
            create_test_hazard("flood", "nature", HazardType::Standard, 9.0e5),
            create_test_hazard("grid", "technology", HazardType::Standard, 4.0e5),
            create_test_hazard("sabotage", "", HazardType::MaliciousActor, 1.0e5),
        ];

        let aggregates = CatalogueAggregates::compute(&hazards);
        let keys: Vec<_> = aggregates.categories.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(keys, vec!["nature", "technology", "uncategorized"]);

        let nature = &aggregates.categories[0];
        assert_eq!(nature.hazard_count, 2);
        assert_eq!(nature.sum_risk, 1.1e6);
        assert_eq!(nature.max_risk, 9.0e5);
        assert_eq!(nature.riskiest_hazard, "flood");
        assert_eq!(nature.mrs_counts.major, 2);
        assert_eq!(nature.mrs_counts.extreme, 0);
    }

    #[test]
    fn test_type_groups() {
        let hazards = vec![
            create_test_hazard("a", "x", HazardType::Emerging, 1.0),
            create_test_hazard("b", "x", HazardType::Standard, 2.0),
            create_test_hazard("c", "y", HazardType::Standard, 0.5),
        ];

        let aggregates = CatalogueAggregates::compute(&hazards);
        let keys: Vec<_> = aggregates.types.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(keys, vec!["emerging", "standard"]);
        assert_eq!(aggregates.types[1].hazard_count, 2);
        assert_eq!(aggregates.types[1].riskiest_hazard, "b");
    }

    #[test]
    fn test_zero_risk_group_keeps_first_hazard() {
        let hazards = vec![
            create_test_hazard("a", "x", HazardType::Standard, 0.0),
            create_test_hazard("b", "x", HazardType::Standard, 0.0),
        ];
        let aggregates = CatalogueAggregates::compute(&hazards);
        assert_eq!(aggregates.categories[0].riskiest_hazard, "a");
        assert_eq!(aggregates.categories[0].max_risk, 0.0);
    }

    #[test]
    fn test_empty_catalogue() {
        let aggregates = CatalogueAggregates::compute(&[]);
        assert!(aggregates.categories.is_empty());
        assert!(aggregates.types.is_empty());
    }
}
